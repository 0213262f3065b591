//! Site capabilities
//!
//! The host "site" owns the adapter and supplies configuration, grammar
//! hints, result construction, and callback consumption. Rather than one wide
//! interface, the adapter consumes five narrow capabilities bundled in
//! [`Site`]; tests supply minimal fakes for each. The site must outlive the
//! adapter; the bundle holds shared handles, so that contract is upheld by
//! construction.

use std::sync::Arc;

use crate::result::{RecoResult, ResultFactory};

/// Read access to the site's named-property store.
pub trait NamedProperties: Send + Sync {
    /// Returns the property value, or the empty string when unset.
    fn get_string(&self, key: &str) -> String;
    fn get_bool(&self, key: &str, default: bool) -> bool;
}

/// Ordered grammar hints for the next turn.
pub trait GrammarHints: Send + Sync {
    fn listen_for_list(&self) -> Vec<String>;
}

/// Intent-provider coordinates. All three fields must be non-empty for the
/// intent branch of the speech context to be emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentInfo {
    pub provider: String,
    pub id: String,
    pub key: String,
}

pub trait IntentSource: Send + Sync {
    fn intent_info(&self) -> IntentInfo;
}

/// Callback sink. Every call arrives with no adapter lock held, so the site
/// may re-enter the adapter freely.
pub trait SiteEvents: Send + Sync {
    fn starting_turn(&self);
    fn started_turn(&self, tag: &str);
    fn detected_speech_start(&self, offset: u64);
    fn detected_speech_end(&self, offset: u64);
    fn intermediate_result(&self, offset: u64, result: RecoResult);
    fn final_result(&self, offset: u64, result: RecoResult);
    fn translation_synthesis(&self, result: RecoResult);
    fn stopped_turn(&self);
    fn requesting_audio_idle(&self);
    fn completed_set_format_stop(&self);
    fn error(&self, message: &str);
}

/// The five capabilities the adapter needs from its host.
#[derive(Clone)]
pub struct Site {
    pub properties: Arc<dyn NamedProperties>,
    pub hints: Arc<dyn GrammarHints>,
    pub intents: Arc<dyn IntentSource>,
    pub results: Arc<dyn ResultFactory>,
    pub events: Arc<dyn SiteEvents>,
}
