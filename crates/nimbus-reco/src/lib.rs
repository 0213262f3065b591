//! Recognition-engine adapter for a remote streaming speech service
//!
//! This crate sits between a push-style audio source and a streaming
//! speech-recognition service: the host "site" feeds it configuration and
//! audio, the adapter translates that into the correct sequence of control
//! and audio frames on an abstract transport session, and service events come
//! back as callbacks on the site.
//!
//! The moving parts:
//! - a two-axis state machine (`state`) gating every transition,
//! - a chunked uploader (`chunker`) with a WAV-like prelude per turn
//!   (`format`),
//! - a result correlator that holds the final phrase back while intent
//!   enrichment is outstanding,
//! - the turn controller (`adapter`) tying them together.
//!
//! The site is consumed as five narrow capabilities (`site`), the transport
//! as two traits (`transport`), so tests can drive the whole adapter with
//! in-memory fakes.

pub mod adapter;
mod chunker;
pub mod constants;
mod context;
mod correlator;
pub mod error;
pub mod events;
pub mod format;
pub mod resolver;
pub mod result;
mod session;
pub mod site;
pub mod state;
pub mod transport;

pub use adapter::RecoEngineAdapter;
pub use error::AdapterError;
pub use events::ServiceEvent;
pub use format::{wav_header, AudioFormat};
pub use resolver::{AuthScheme, EndpointKind, RecognitionMode, SessionConfig};
pub use result::{BasicResultFactory, RecoResult, ResultFactory, ResultKind};
pub use site::{GrammarHints, IntentInfo, IntentSource, NamedProperties, Site, SiteEvents};
pub use state::{AudioState, ServiceState, StatePair};
pub use transport::{RecoSession, SessionConnector};
