//! Shared fakes for driving the adapter end to end
//!
//! `FakeSite` implements the property/hint/intent/callback capabilities and
//! records every callback; `FakeConnector`/`FakeSession` record every wire
//! operation. Together they let the scenario tests assert exact callback and
//! wire ordering.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use nimbus_reco::error::AdapterError;
use nimbus_reco::resolver::SessionConfig;
use nimbus_reco::result::RecoResult;
use nimbus_reco::{
    BasicResultFactory, GrammarHints, IntentInfo, IntentSource, NamedProperties, RecoEngineAdapter,
    RecoSession, SessionConnector, Site, SiteEvents,
};

/// Summarized site callback, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteCall {
    StartingTurn,
    StartedTurn(String),
    SpeechStart(u64),
    SpeechEnd(u64),
    Intermediate(u64, String),
    Final(u64, String),
    TranslationSynthesis,
    StoppedTurn,
    RequestingAudioIdle,
    CompletedSetFormatStop,
    Error(String),
}

#[derive(Default)]
pub struct FakeSite {
    strings: Mutex<HashMap<String, String>>,
    bools: Mutex<HashMap<String, bool>>,
    listen_for: Mutex<Vec<String>>,
    intent: Mutex<IntentInfo>,
    pub calls: Mutex<Vec<SiteCall>>,
    /// Full result objects, for payload-level assertions.
    pub finals: Mutex<Vec<RecoResult>>,
    pub intermediates: Mutex<Vec<RecoResult>>,
    pub syntheses: Mutex<Vec<RecoResult>>,
}

impl FakeSite {
    /// A site with just enough configuration to open a session.
    pub fn new() -> Arc<Self> {
        let site = Self::default();
        site.strings
            .lock()
            .insert("speech.subscription_key".into(), "test-key".into());
        Arc::new(site)
    }

    pub fn set_string(&self, key: &str, value: &str) {
        self.strings.lock().insert(key.into(), value.into());
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        self.bools.lock().insert(key.into(), value);
    }

    pub fn set_listen_for(&self, entries: &[&str]) {
        *self.listen_for.lock() = entries.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_intent(&self, provider: &str, id: &str, key: &str) {
        *self.intent.lock() = IntentInfo {
            provider: provider.into(),
            id: id.into(),
            key: key.into(),
        };
    }

    pub fn calls(&self) -> Vec<SiteCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

impl NamedProperties for FakeSite {
    fn get_string(&self, key: &str) -> String {
        self.strings.lock().get(key).cloned().unwrap_or_default()
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.bools.lock().get(key).copied().unwrap_or(default)
    }
}

impl GrammarHints for FakeSite {
    fn listen_for_list(&self) -> Vec<String> {
        self.listen_for.lock().clone()
    }
}

impl IntentSource for FakeSite {
    fn intent_info(&self) -> IntentInfo {
        self.intent.lock().clone()
    }
}

impl SiteEvents for FakeSite {
    fn starting_turn(&self) {
        self.calls.lock().push(SiteCall::StartingTurn);
    }

    fn started_turn(&self, tag: &str) {
        self.calls.lock().push(SiteCall::StartedTurn(tag.into()));
    }

    fn detected_speech_start(&self, offset: u64) {
        self.calls.lock().push(SiteCall::SpeechStart(offset));
    }

    fn detected_speech_end(&self, offset: u64) {
        self.calls.lock().push(SiteCall::SpeechEnd(offset));
    }

    fn intermediate_result(&self, offset: u64, result: RecoResult) {
        self.calls.lock().push(SiteCall::Intermediate(offset, result.text.clone()));
        self.intermediates.lock().push(result);
    }

    fn final_result(&self, offset: u64, result: RecoResult) {
        self.calls.lock().push(SiteCall::Final(offset, result.text.clone()));
        self.finals.lock().push(result);
    }

    fn translation_synthesis(&self, result: RecoResult) {
        self.calls.lock().push(SiteCall::TranslationSynthesis);
        self.syntheses.lock().push(result);
    }

    fn stopped_turn(&self) {
        self.calls.lock().push(SiteCall::StoppedTurn);
    }

    fn requesting_audio_idle(&self) {
        self.calls.lock().push(SiteCall::RequestingAudioIdle);
    }

    fn completed_set_format_stop(&self) {
        self.calls.lock().push(SiteCall::CompletedSetFormatStop);
    }

    fn error(&self, message: &str) {
        self.calls.lock().push(SiteCall::Error(message.into()));
    }
}

/// One outbound transport operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireOp {
    Control { path: String, body: String },
    Audio(Vec<u8>),
    Flush,
}

#[derive(Default)]
pub struct FakeSession {
    pub ops: Mutex<Vec<WireOp>>,
}

impl FakeSession {
    pub fn ops(&self) -> Vec<WireOp> {
        self.ops.lock().clone()
    }
}

impl RecoSession for FakeSession {
    fn send_message(&self, path: &str, body: &[u8]) {
        self.ops.lock().push(WireOp::Control {
            path: path.into(),
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }

    fn write_audio(&self, bytes: &[u8]) {
        self.ops.lock().push(WireOp::Audio(bytes.to_vec()));
    }

    fn flush_audio(&self) {
        self.ops.lock().push(WireOp::Flush);
    }
}

#[derive(Default)]
pub struct FakeConnector {
    session: Mutex<Option<Arc<FakeSession>>>,
    pub connects: Mutex<Vec<SessionConfig>>,
    fail_with: Mutex<Option<AdapterError>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the next connect attempt fail.
    pub fn fail_next(&self, err: AdapterError) {
        *self.fail_with.lock() = Some(err);
    }

    /// The most recently opened session.
    pub fn session(&self) -> Arc<FakeSession> {
        self.session.lock().clone().expect("no session opened yet")
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }
}

impl SessionConnector for FakeConnector {
    fn connect(&self, config: &SessionConfig) -> Result<Arc<dyn RecoSession>, AdapterError> {
        if let Some(err) = self.fail_with.lock().take() {
            return Err(err);
        }
        self.connects.lock().push(config.clone());
        let session = Arc::new(FakeSession::default());
        *self.session.lock() = Some(session.clone());
        Ok(session)
    }
}

pub struct Harness {
    pub site: Arc<FakeSite>,
    pub connector: Arc<FakeConnector>,
    pub adapter: RecoEngineAdapter,
}

pub fn harness() -> Harness {
    let site = FakeSite::new();
    let connector = FakeConnector::new();
    let bundle = Site {
        properties: site.clone(),
        hints: site.clone(),
        intents: site.clone(),
        results: Arc::new(BasicResultFactory),
        events: site.clone(),
    };
    let adapter = RecoEngineAdapter::new(bundle, connector.clone());
    Harness {
        site,
        connector,
        adapter,
    }
}
