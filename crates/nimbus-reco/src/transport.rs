//! Outbound transport seams
//!
//! The adapter never frames wire messages itself; it talks to an abstract
//! session produced by a connector. Dropping the last session handle closes
//! the connection. Inbound traffic travels the other way: the embedder's
//! receive thread parses messages and calls
//! [`RecoEngineAdapter::handle_event`](crate::adapter::RecoEngineAdapter::handle_event).

use std::sync::Arc;

use crate::error::AdapterError;
use crate::resolver::SessionConfig;

/// An open session to the recognition service.
///
/// Calls never return errors: transport failures surface asynchronously as
/// [`ServiceEvent::Error`](crate::events::ServiceEvent) on the event path.
pub trait RecoSession: Send + Sync {
    fn send_message(&self, path: &str, body: &[u8]);
    fn write_audio(&self, bytes: &[u8]);
    fn flush_audio(&self);
}

/// Opens sessions from a resolved configuration snapshot.
pub trait SessionConnector: Send + Sync {
    fn connect(&self, config: &SessionConfig) -> Result<Arc<dyn RecoSession>, AdapterError>;
}
