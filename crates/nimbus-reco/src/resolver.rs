//! Endpoint, recognition-mode, and authentication resolution
//!
//! Turns the site's named properties into the configuration snapshot a
//! session is opened with. Taken once at session-open time; never re-read
//! mid-turn.

use tracing::debug;

use crate::constants::*;
use crate::error::AdapterError;
use crate::site::NamedProperties;

/// Which service endpoint to connect to. First match wins, in the order the
/// variants are resolved below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointKind {
    /// The assistant-SDK endpoint, selected by the literal property value
    /// `CORTANA` (case-insensitive).
    CortanaSdk,
    /// A caller-supplied URL.
    Custom(String),
    Translation {
        from_language: String,
        to_languages: String,
        voice: String,
        model_id: String,
    },
    /// Custom-model endpoint addressed by model id.
    CustomModel(String),
    Speech { language: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    Interactive,
    Conversation,
    Dictation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    SubscriptionKey(String),
    AuthorizationToken(String),
    RpsToken(String),
}

/// Configuration snapshot handed to the session connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub endpoint: EndpointKind,
    pub mode: RecognitionMode,
    pub auth: AuthScheme,
}

/// Mode substrings matched case-sensitively in a custom endpoint path.
const URL_SEGMENT_INTERACTIVE: &str = "/interactive/";
const URL_SEGMENT_CONVERSATION: &str = "/conversation/";
const URL_SEGMENT_DICTATION: &str = "/dictation/";

pub fn resolve_session_config(props: &dyn NamedProperties) -> Result<SessionConfig, AdapterError> {
    let (endpoint, custom_endpoint) = resolve_endpoint(props)?;
    let mode = resolve_mode(props, custom_endpoint)?;
    let auth = resolve_auth(props)?;
    debug!("resolved session config: endpoint={:?} mode={:?}", endpoint, mode);
    Ok(SessionConfig { endpoint, mode, auth })
}

fn resolve_endpoint(props: &dyn NamedProperties) -> Result<(EndpointKind, bool), AdapterError> {
    let endpoint = props.get_string(PROP_ENDPOINT);
    if endpoint.eq_ignore_ascii_case("CORTANA") {
        return Ok((EndpointKind::CortanaSdk, false));
    }
    if !endpoint.is_empty() {
        debug!("using custom endpoint url: {}", endpoint);
        return Ok((EndpointKind::Custom(endpoint), true));
    }

    let from_language = props.get_string(PROP_TRANSLATION_FROM);
    if !from_language.is_empty() {
        let to_languages = props.get_string(PROP_TRANSLATION_TO);
        if to_languages.is_empty() {
            return Err(AdapterError::InvalidArgument(
                "translation source language set without target languages".into(),
            ));
        }
        return Ok((
            EndpointKind::Translation {
                from_language,
                to_languages,
                voice: props.get_string(PROP_TRANSLATION_VOICE),
                model_id: props.get_string(PROP_MODEL_ID),
            },
            false,
        ));
    }

    let model_id = props.get_string(PROP_MODEL_ID);
    if !model_id.is_empty() {
        return Ok((EndpointKind::CustomModel(model_id), false));
    }

    let language = props.get_string(PROP_RECO_LANGUAGE);
    let language = (!language.is_empty()).then_some(language);
    Ok((EndpointKind::Speech { language }, false))
}

fn resolve_mode(
    props: &dyn NamedProperties,
    custom_endpoint: bool,
) -> Result<RecognitionMode, AdapterError> {
    if let Some(mode) = mode_from_property(props)? {
        return Ok(mode);
    }
    if custom_endpoint {
        debug!("reco mode not in properties, checking custom endpoint path");
        if let Some(mode) = mode_from_endpoint(&props.get_string(PROP_ENDPOINT)) {
            return Ok(mode);
        }
    }
    Ok(RecognitionMode::Interactive)
}

fn mode_from_property(props: &dyn NamedProperties) -> Result<Option<RecognitionMode>, AdapterError> {
    let value = props.get_string(PROP_RECO_MODE);
    if value.is_empty() {
        return Ok(None);
    }
    if value.eq_ignore_ascii_case("interactive") {
        Ok(Some(RecognitionMode::Interactive))
    } else if value.eq_ignore_ascii_case("conversation") {
        Ok(Some(RecognitionMode::Conversation))
    } else if value.eq_ignore_ascii_case("dictation") {
        Ok(Some(RecognitionMode::Dictation))
    } else {
        Err(AdapterError::InvalidArgument(format!(
            "unknown recognition mode '{value}'"
        )))
    }
}

fn mode_from_endpoint(endpoint: &str) -> Option<RecognitionMode> {
    if endpoint.contains(URL_SEGMENT_INTERACTIVE) {
        Some(RecognitionMode::Interactive)
    } else if endpoint.contains(URL_SEGMENT_CONVERSATION) {
        Some(RecognitionMode::Conversation)
    } else if endpoint.contains(URL_SEGMENT_DICTATION) {
        Some(RecognitionMode::Dictation)
    } else {
        None
    }
}

fn resolve_auth(props: &dyn NamedProperties) -> Result<AuthScheme, AdapterError> {
    let subscription_key = props.get_string(PROP_SUBSCRIPTION_KEY);
    if !subscription_key.is_empty() {
        return Ok(AuthScheme::SubscriptionKey(subscription_key));
    }
    let auth_token = props.get_string(PROP_AUTH_TOKEN);
    if !auth_token.is_empty() {
        return Ok(AuthScheme::AuthorizationToken(auth_token));
    }
    let rps_token = props.get_string(PROP_RPS_TOKEN);
    if !rps_token.is_empty() {
        return Ok(AuthScheme::RpsToken(rps_token));
    }
    Err(AdapterError::InvalidArgument(
        "no authentication parameters were specified".into(),
    ))
}
