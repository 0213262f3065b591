//! `speech.context` payload assembly
//!
//! A pure function of the site's grammar hints, intent coordinates, and the
//! two suppressor switches. The serialized shape is part of the wire
//! contract, so the structs below serialize in declared field order.

use serde::{Deserialize, Serialize};

use crate::site::IntentInfo;

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub(crate) struct SpeechContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dgi: Option<DynamicGrammar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentContext>,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub(crate) struct DynamicGrammar {
    #[serde(rename = "Groups", default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GrammarGroup>,
    #[serde(rename = "ReferenceGrammars", default, skip_serializing_if = "Vec::is_empty")]
    pub reference_grammars: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct GrammarGroup {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Items")]
    pub items: Vec<GrammarItem>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct GrammarItem {
    #[serde(rename = "Text")]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct IntentContext {
    pub provider: String,
    pub id: String,
    pub key: String,
}

/// The assembled payload plus whether the service was asked for intent
/// enrichment (which commits the adapter to correlating the final phrase).
pub(crate) struct SpeechContextPayload {
    pub json: Option<String>,
    pub expect_intent_response: bool,
}

/// A listen-for entry is a reference grammar iff it is `{scope:name}` shaped:
/// longer than 3 chars, brace-wrapped, with a `:` inside. The braces are
/// stripped and the first `:` becomes `/`. Everything else is a generic item.
fn classify_listen_for(listen_for: &[String]) -> (Vec<String>, Vec<String>) {
    let mut grammars = Vec::new();
    let mut generic = Vec::new();
    for entry in listen_for {
        if entry.len() > 3 && entry.starts_with('{') && entry.ends_with('}') && entry.contains(':')
        {
            let inner = &entry[1..entry.len() - 1];
            grammars.push(inner.replacen(':', "/", 1));
        } else {
            generic.push(entry.clone());
        }
    }
    (grammars, generic)
}

pub(crate) fn build_speech_context(
    listen_for: &[String],
    intent: &IntentInfo,
    no_dgi: bool,
    no_intent_json: bool,
) -> SpeechContextPayload {
    let dgi = if no_dgi {
        None
    } else {
        let (reference_grammars, generic) = classify_listen_for(listen_for);
        if reference_grammars.is_empty() && generic.is_empty() {
            None
        } else {
            let groups = if generic.is_empty() {
                Vec::new()
            } else {
                vec![GrammarGroup {
                    kind: "Generic".to_string(),
                    items: generic.into_iter().map(|text| GrammarItem { text }).collect(),
                }]
            };
            Some(DynamicGrammar { groups, reference_grammars })
        }
    };

    let intent_present = !no_intent_json
        && !intent.provider.is_empty()
        && !intent.id.is_empty()
        && !intent.key.is_empty();
    let intent_ctx = intent_present.then(|| IntentContext {
        provider: intent.provider.clone(),
        id: intent.id.clone(),
        key: intent.key.clone(),
    });

    let json = if dgi.is_none() && intent_ctx.is_none() {
        None
    } else {
        let context = SpeechContext { dgi, intent: intent_ctx };
        // Serialization of a plain struct tree cannot fail.
        serde_json::to_string(&context).ok()
    };

    SpeechContextPayload {
        json,
        expect_intent_response: intent_present,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn intent(provider: &str, id: &str, key: &str) -> IntentInfo {
        IntentInfo {
            provider: provider.into(),
            id: id.into(),
            key: key.into(),
        }
    }

    #[test]
    fn empty_inputs_produce_no_message() {
        let payload = build_speech_context(&[], &IntentInfo::default(), false, false);
        assert!(payload.json.is_none());
        assert!(!payload.expect_intent_response);
    }

    #[test]
    fn generic_items_only() {
        let payload =
            build_speech_context(&strings(&["play music", "stop"]), &IntentInfo::default(), false, false);
        assert_eq!(
            payload.json.as_deref(),
            Some(
                r#"{"dgi":{"Groups":[{"Type":"Generic","Items":[{"Text":"play music"},{"Text":"stop"}]}]}}"#
            )
        );
    }

    #[test]
    fn reference_grammar_classification() {
        let payload = build_speech_context(
            &strings(&["{luis:app-model}", "plain"]),
            &IntentInfo::default(),
            false,
            false,
        );
        let json = payload.json.unwrap();
        assert!(json.contains(r#""ReferenceGrammars":["luis/app-model"]"#));
        assert!(json.contains(r#""Text":"plain""#));
    }

    #[test]
    fn brace_wrapped_without_colon_is_generic() {
        let payload =
            build_speech_context(&strings(&["{nope}"]), &IntentInfo::default(), false, false);
        let json = payload.json.unwrap();
        assert!(!json.contains("ReferenceGrammars"));
        assert!(json.contains(r#""Text":"{nope}""#));
    }

    #[test]
    fn short_entries_are_generic() {
        // "{:}" has length 3 and must not be treated as a reference grammar.
        let payload = build_speech_context(&strings(&["{:}"]), &IntentInfo::default(), false, false);
        assert!(payload.json.unwrap().contains(r#""Text":"{:}""#));
    }

    #[test]
    fn only_first_colon_is_replaced() {
        let payload = build_speech_context(
            &strings(&["{scope:name:v2}"]),
            &IntentInfo::default(),
            false,
            false,
        );
        assert!(payload.json.unwrap().contains(r#""ReferenceGrammars":["scope/name:v2"]"#));
    }

    #[test]
    fn intent_branch_requires_all_three_fields() {
        let payload = build_speech_context(&[], &intent("luis", "app", ""), false, false);
        assert!(payload.json.is_none());
        assert!(!payload.expect_intent_response);

        let payload = build_speech_context(&[], &intent("luis", "app", "key1"), false, false);
        assert_eq!(
            payload.json.as_deref(),
            Some(r#"{"intent":{"provider":"luis","id":"app","key":"key1"}}"#)
        );
        assert!(payload.expect_intent_response);
    }

    #[test]
    fn no_dgi_suppresses_grammar_branch() {
        let payload =
            build_speech_context(&strings(&["hello"]), &intent("luis", "app", "key1"), true, false);
        assert_eq!(
            payload.json.as_deref(),
            Some(r#"{"intent":{"provider":"luis","id":"app","key":"key1"}}"#)
        );
    }

    #[test]
    fn no_intent_json_suppresses_intent_and_expectation() {
        let payload =
            build_speech_context(&strings(&["hello"]), &intent("luis", "app", "key1"), false, true);
        let json = payload.json.unwrap();
        assert!(!json.contains("intent"));
        assert!(!payload.expect_intent_response);
    }

    #[test]
    fn round_trips_through_parse() {
        let listen_for = strings(&["{luis:model}", "turn it up", "{g:h}"]);
        let info = intent("luis", "app-id", "app-key");
        let payload = build_speech_context(&listen_for, &info, false, false);
        let parsed: SpeechContext = serde_json::from_str(&payload.json.unwrap()).unwrap();

        let dgi = parsed.dgi.unwrap();
        assert_eq!(dgi.reference_grammars, vec!["luis/model", "g/h"]);
        assert_eq!(dgi.groups.len(), 1);
        assert_eq!(dgi.groups[0].kind, "Generic");
        assert_eq!(dgi.groups[0].items, vec![GrammarItem { text: "turn it up".into() }]);

        let parsed_intent = parsed.intent.unwrap();
        assert_eq!(parsed_intent.provider, info.provider);
        assert_eq!(parsed_intent.id, info.id);
        assert_eq!(parsed_intent.key, info.key);
    }
}
