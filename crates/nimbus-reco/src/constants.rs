//! Property keys and wire constants shared across the adapter

/// Named-property keys read from the site's property store.
pub const PROP_ENDPOINT: &str = "speech.endpoint";
pub const PROP_MODEL_ID: &str = "speech.model_id";
pub const PROP_RECO_MODE: &str = "speech.reco_mode";
pub const PROP_RECO_LANGUAGE: &str = "speech.reco_language";
pub const PROP_SUBSCRIPTION_KEY: &str = "speech.subscription_key";
pub const PROP_AUTH_TOKEN: &str = "speech.auth_token";
pub const PROP_RPS_TOKEN: &str = "speech.rps_token";
pub const PROP_TRANSLATION_FROM: &str = "translation.from_language";
pub const PROP_TRANSLATION_TO: &str = "translation.to_languages";
pub const PROP_TRANSLATION_VOICE: &str = "translation.voice";

/// Internal tuning switches, looked up as booleans.
pub const PROP_NO_DGI: &str = "CARBON-INTERNAL-USP-NoDGI";
pub const PROP_NO_INTENT_JSON: &str = "CARBON-INTERNAL-USP-NoIntentJson";
pub const PROP_RESET_AFTER_ERROR: &str = "CARBON-INTERNAL-USP-ResetAfterError";

/// Outbound control-message path carrying grammar hints and intent info.
pub const SPEECH_CONTEXT_PATH: &str = "speech.context";

/// Inbound user-message path carrying the intent service's response.
pub const RESPONSE_PATH: &str = "response";

/// Service-preferred audio chunk cadence. A frame holds this many
/// milliseconds of audio at the negotiated format.
pub(crate) const PREFERRED_CHUNK_MS: u32 = 128;
