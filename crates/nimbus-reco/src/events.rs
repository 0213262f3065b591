//! Inbound service events
//!
//! The transport's receive thread parses wire messages and hands them to the
//! adapter as `ServiceEvent` values. Offsets and durations are in 100 ns
//! ticks, as reported by the service.

/// Outcome reported with a final phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionStatus {
    Success,
    NoMatch,
    InitialSilenceTimeout,
    BabbleTimeout,
    Error,
}

/// Final recognition of (part of) the utterance.
#[derive(Debug, Clone)]
pub struct SpeechPhrase {
    pub status: RecognitionStatus,
    pub display_text: String,
    pub offset: u64,
    pub duration: u64,
    /// Raw service payload, attached to the result verbatim.
    pub json: String,
}

/// Partial recognition in interactive mode.
#[derive(Debug, Clone)]
pub struct SpeechHypothesis {
    pub text: String,
    pub offset: u64,
    pub duration: u64,
    pub json: String,
}

/// Partial recognition in continuous modes.
#[derive(Debug, Clone)]
pub struct SpeechFragment {
    pub text: String,
    pub offset: u64,
    pub duration: u64,
    pub json: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStatus {
    Success,
    Error,
}

/// Translations keyed by target language, plus the service's verdict.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub status: TranslationStatus,
    pub translations: Vec<(String, String)>,
    pub failure_reason: String,
}

#[derive(Debug, Clone)]
pub struct TranslationHypothesis {
    pub text: String,
    pub offset: u64,
    pub duration: u64,
    pub json: String,
    pub translation: TranslationResult,
}

#[derive(Debug, Clone)]
pub struct TranslationPhrase {
    pub status: RecognitionStatus,
    pub text: String,
    pub offset: u64,
    pub duration: u64,
    pub json: String,
    pub translation: TranslationResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStatus {
    Success,
    Error,
}

/// Everything the service can push at the adapter.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    TurnStart { tag: String },
    SpeechStartDetected { offset: u64 },
    SpeechHypothesis(SpeechHypothesis),
    SpeechFragment(SpeechFragment),
    SpeechPhrase(SpeechPhrase),
    SpeechEndDetected { offset: u64 },
    TranslationHypothesis(TranslationHypothesis),
    TranslationPhrase(TranslationPhrase),
    TranslationSynthesis { audio: Vec<u8> },
    TranslationSynthesisEnd { status: SynthesisStatus, failure_reason: String },
    TurnEnd,
    UserMessage { path: String, content_type: String, body: Vec<u8> },
    Error { message: String },
}
