//! Late-bound final-result correlation
//!
//! When the speech context asked for intent enrichment, the final phrase is
//! held back until either the intent payload arrives on the user-message
//! channel or the turn ends, whichever comes first. The slot holds at most
//! one phrase; draining is take-based, so whichever of the two paths loses
//! the race finds the slot empty and does nothing.

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::events::SpeechPhrase;
use crate::result::ResultKind;
use crate::site::Site;

pub(crate) struct ResultCorrelator {
    pending: Mutex<Option<SpeechPhrase>>,
}

impl ResultCorrelator {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Holds `phrase` back for later completion. Called only under the
    /// transition into the awaiting-intent state.
    pub fn remember(&self, phrase: SpeechPhrase) {
        debug!("holding final phrase pending intent: '{}'", phrase.display_text);
        *self.pending.lock() = Some(phrase);
    }

    /// Fires the held phrase as a final result, attaching `intent_json` when
    /// non-empty. A drained slot is a no-op.
    pub fn complete(&self, site: &Site, intent_json: &str) {
        let Some(phrase) = self.pending.lock().take() else {
            trace!("no pending phrase to complete, intent already resolved");
            return;
        };
        fire_final_now(site, &phrase, intent_json);
    }
}

/// Builds and fires a final speech result from a phrase message.
pub(crate) fn fire_final_now(site: &Site, phrase: &SpeechPhrase, intent_json: &str) {
    let mut result = site.results.create_final(&phrase.display_text, ResultKind::Speech);
    result.json = phrase.json.clone();
    if !intent_json.is_empty() {
        result.intent_json = Some(intent_json.to_string());
    }
    site.events.final_result(phrase.offset, result);
}
