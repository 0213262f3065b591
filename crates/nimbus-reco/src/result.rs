//! Recognition result objects and the site's factory capability

use crate::events::{SynthesisStatus, TranslationStatus};

/// What kind of result a factory is being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Speech,
    TranslationText,
    TranslationSynthesis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationTextStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationSynthesisStatus {
    Success,
    /// End-of-synthesis marker: no more audio will follow for this phrase.
    SynthesisEnd,
    Error,
}

/// Translation-text initialization payload.
#[derive(Debug, Clone)]
pub struct TranslationTextInit {
    pub status: TranslationTextStatus,
    pub translations: Vec<(String, String)>,
    pub failure_reason: String,
}

/// Translation-synthesis initialization payload.
#[derive(Debug, Clone)]
pub struct SynthesisInit {
    pub status: TranslationSynthesisStatus,
    pub audio: Vec<u8>,
    pub failure_reason: String,
}

/// A result handed to the site. The adapter fills in the raw service json,
/// the optional intent payload, and the translation variants; the factory
/// owns creation so sites can stamp results with their own bookkeeping.
#[derive(Debug, Clone)]
pub struct RecoResult {
    pub kind: ResultKind,
    pub text: String,
    pub json: String,
    pub intent_json: Option<String>,
    pub translation: Option<TranslationTextInit>,
    pub synthesis: Option<SynthesisInit>,
}

impl RecoResult {
    pub fn new(kind: ResultKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            json: String::new(),
            intent_json: None,
            translation: None,
            synthesis: None,
        }
    }

    pub fn init_translation_text(
        &mut self,
        status: TranslationStatus,
        translations: Vec<(String, String)>,
        failure_reason: String,
    ) {
        let status = match status {
            TranslationStatus::Success => TranslationTextStatus::Success,
            TranslationStatus::Error => TranslationTextStatus::Error,
        };
        self.translation = Some(TranslationTextInit {
            status,
            translations,
            failure_reason,
        });
    }

    pub fn init_synthesis(&mut self, status: TranslationSynthesisStatus, audio: Vec<u8>, failure_reason: String) {
        self.synthesis = Some(SynthesisInit {
            status,
            audio,
            failure_reason,
        });
    }
}

/// Maps the end-of-synthesis wire status onto the result status: a successful
/// end event is the `SynthesisEnd` marker, not plain success.
pub(crate) fn synthesis_end_status(status: SynthesisStatus) -> TranslationSynthesisStatus {
    match status {
        SynthesisStatus::Success => TranslationSynthesisStatus::SynthesisEnd,
        SynthesisStatus::Error => TranslationSynthesisStatus::Error,
    }
}

/// Result-object factory supplied by the site.
pub trait ResultFactory: Send + Sync {
    fn create_intermediate(&self, text: &str, kind: ResultKind) -> RecoResult;
    fn create_final(&self, text: &str, kind: ResultKind) -> RecoResult;
}

/// Factory that builds plain results with no site-side bookkeeping.
#[derive(Debug, Default)]
pub struct BasicResultFactory;

impl ResultFactory for BasicResultFactory {
    fn create_intermediate(&self, text: &str, kind: ResultKind) -> RecoResult {
        RecoResult::new(kind, text)
    }

    fn create_final(&self, text: &str, kind: ResultKind) -> RecoResult {
        RecoResult::new(kind, text)
    }
}
