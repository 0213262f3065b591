//! Turn controller
//!
//! `RecoEngineAdapter` consumes the site's push-style callbacks on one side
//! and the service's event stream on the other, drives the two-axis state
//! machine, and owns the uploader, the session facade, and the result
//! correlator. Site ingress and service events arrive on different threads;
//! the state lock serializes them, and every guard is dropped before any site
//! callback or transport send so the site may re-enter the adapter freely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::chunker::ChunkedUploader;
use crate::constants::{
    PREFERRED_CHUNK_MS, PROP_NO_DGI, PROP_NO_INTENT_JSON, PROP_RESET_AFTER_ERROR, RESPONSE_PATH,
    SPEECH_CONTEXT_PATH,
};
use crate::context::build_speech_context;
use crate::correlator::{fire_final_now, ResultCorrelator};
use crate::error::AdapterError;
use crate::events::{
    RecognitionStatus, ServiceEvent, SpeechFragment, SpeechHypothesis, SpeechPhrase,
    SynthesisStatus, TranslationHypothesis, TranslationPhrase,
};
use crate::format::{wav_header, AudioFormat};
use crate::resolver::{resolve_session_config, RecognitionMode, SessionConfig};
use crate::result::{synthesis_end_status, ResultKind, TranslationSynthesisStatus};
use crate::session::ServiceLink;
use crate::site::Site;
use crate::state::{AudioState, ServiceState, StatePair, TurnState};
use crate::transport::SessionConnector;

pub struct RecoEngineAdapter {
    site: Site,
    connector: Arc<dyn SessionConnector>,
    state: Arc<TurnState>,
    link: ServiceLink,
    uploader: ChunkedUploader,
    correlator: ResultCorrelator,
    format: Mutex<Option<AudioFormat>>,
    config: Mutex<Option<SessionConfig>>,
    initialized: AtomicBool,
    single_shot: AtomicBool,
    expect_intent: AtomicBool,
}

impl RecoEngineAdapter {
    /// The site bundle must outlive the adapter; holding shared capability
    /// handles in `Site` upholds that by construction.
    pub fn new(site: Site, connector: Arc<dyn SessionConnector>) -> Self {
        let state = Arc::new(TurnState::new());
        let link = ServiceLink::new(state.clone());
        Self {
            site,
            connector,
            state,
            link,
            uploader: ChunkedUploader::new(),
            correlator: ResultCorrelator::new(),
            format: Mutex::new(None),
            config: Mutex::new(None),
            initialized: AtomicBool::new(false),
            single_shot: AtomicBool::new(false),
            expect_intent: AtomicBool::new(false),
        }
    }

    /// One-time activation. Does not open a session.
    pub fn init(&self) -> Result<(), AdapterError> {
        if self.initialized.swap(true, Ordering::SeqCst) || self.link.is_open() {
            return Err(AdapterError::AlreadyInitialized);
        }
        debug_assert_eq!(self.state.snapshot(), StatePair::IDLE);
        Ok(())
    }

    /// Records single-shot vs continuous teardown behavior. Called outside
    /// any turn.
    pub fn set_mode(&self, single_shot: bool) {
        trace!("set_mode: single_shot={single_shot}");
        self.single_shot.store(single_shot, Ordering::SeqCst);
    }

    /// Current state pair, for observers and tests.
    pub fn state(&self) -> StatePair {
        self.state.snapshot()
    }

    /// Feed of committed state transitions.
    pub fn subscribe_states(&self) -> Receiver<StatePair> {
        self.state.subscribe()
    }

    /// A non-null format arms the audio-ready state and stores the
    /// descriptor; the session itself opens lazily on the first audio so a
    /// `set_format(None)` right after never touches the network. A null
    /// format is the stop signal: the audio axis returns to idle and the
    /// site's completed-stop callback fires.
    pub fn set_format(&self, format: Option<&AudioFormat>) -> Result<(), AdapterError> {
        self.ensure_initialized()?;
        let mut g = self.state.write();
        if g.is_bad() && g.service != ServiceState::Terminating {
            trace!("set_format: ignoring in state {:?}/{:?}", g.audio, g.service);
            return Ok(());
        }

        match format {
            Some(fmt) => {
                let from = StatePair::new(AudioState::Idle, g.service);
                let to = from.with_audio(AudioState::Ready);
                if g.service == ServiceState::Idle && self.state.commit(&mut g, from, to) {
                    trace!(
                        "set_format: tag={} channels={} rate={} bits={}",
                        fmt.tag,
                        fmt.channels,
                        fmt.sample_rate,
                        fmt.bits_per_sample
                    );
                    *self.format.lock() = Some(fmt.clone());
                    self.uploader.set_frame_size(0);
                } else {
                    warn!("set_format: unexpected state {:?}/{:?}, dropping", g.audio, g.service);
                }
            }
            None => {
                let cur = *g;
                let accepted = self.state.commit(&mut g, cur, cur.with_audio(AudioState::Idle))
                    || g.service == ServiceState::Terminating;
                if accepted {
                    drop(g);
                    trace!("set_format(none): completed set-format stop");
                    self.site.events.completed_set_format_stop();
                    *self.format.lock() = None;
                } else {
                    warn!("set_format(none): unexpected state {:?}/{:?}", g.audio, g.service);
                }
            }
        }
        Ok(())
    }

    /// Pushes audio into the current turn, starting one if the adapter is
    /// armed. An empty slice flushes. Errors opening the session on the first
    /// audio of a turn propagate to the caller and park the service axis in
    /// `Error`.
    pub fn process_audio(&self, data: &[u8]) -> Result<(), AdapterError> {
        self.ensure_initialized()?;
        let mut g = self.state.write();
        if g.is_bad() {
            trace!("process_audio: ignoring in state {:?}/{:?}", g.audio, g.service);
            return Ok(());
        }

        let armed = StatePair::new(AudioState::Ready, ServiceState::Idle);
        let sending = StatePair::new(AudioState::Sending, ServiceState::WaitingForTurnStart);
        if !data.is_empty() && self.state.commit(&mut g, armed, sending) {
            drop(g);
            trace!("process_audio: starting turn, {} bytes", data.len());
            if let Err(err) = self.start_turn(data) {
                let mut g = self.state.write();
                let cur = *g;
                self.state.commit(&mut g, cur, cur.with_service(ServiceState::Error));
                return Err(err);
            }
            self.site.events.starting_turn();
        } else if !data.is_empty() && g.audio == AudioState::Sending {
            drop(g);
            self.uploader.write(&self.link, data);
        } else if data.is_empty() && g.audio == AudioState::Sending {
            drop(g);
            trace!("process_audio: flush requested");
            self.uploader.flush(&self.link);
        } else {
            trace!(
                "process_audio: ignoring {} bytes in state {:?}/{:?}",
                data.len(),
                g.audio,
                g.service
            );
        }
        Ok(())
    }

    /// Tears the adapter down: `Terminating`, destroy the session (failing
    /// any in-flight send fast), then `Zombie`. Idempotent; after the first
    /// call every ingress and event is a no-op drop. Fires no site callback.
    pub fn term(&self) {
        debug!("terminating recognition adapter");
        let mut g = self.state.write();
        let cur = *g;
        if self.state.commit(&mut g, cur, cur.with_service(ServiceState::Terminating)) {
            drop(g);
            drop(self.link.take());

            let mut g = self.state.write();
            let cur = *g;
            self.state.commit(&mut g, cur, cur.with_service(ServiceState::Zombie));
        } else {
            trace!("term: already torn down ({:?}/{:?})", g.audio, g.service);
        }
    }

    /// Entry point for the transport's receive thread.
    pub fn handle_event(&self, event: ServiceEvent) {
        match event {
            ServiceEvent::TurnStart { tag } => self.on_turn_start(&tag),
            ServiceEvent::SpeechStartDetected { offset } => self.on_speech_start_detected(offset),
            ServiceEvent::SpeechHypothesis(msg) => self.on_speech_hypothesis(msg),
            ServiceEvent::SpeechFragment(msg) => self.on_speech_fragment(msg),
            ServiceEvent::SpeechPhrase(msg) => self.on_speech_phrase(msg),
            ServiceEvent::SpeechEndDetected { offset } => self.on_speech_end_detected(offset),
            ServiceEvent::TranslationHypothesis(msg) => self.on_translation_hypothesis(msg),
            ServiceEvent::TranslationPhrase(msg) => self.on_translation_phrase(msg),
            ServiceEvent::TranslationSynthesis { audio } => self.on_translation_synthesis(audio),
            ServiceEvent::TranslationSynthesisEnd { status, failure_reason } => {
                self.on_translation_synthesis_end(status, &failure_reason)
            }
            ServiceEvent::TurnEnd => self.on_turn_end(),
            ServiceEvent::UserMessage { path, content_type, body } => {
                self.on_user_message(&path, &content_type, &body)
            }
            ServiceEvent::Error { message } => self.on_error(&message),
        }
    }

    fn ensure_initialized(&self) -> Result<(), AdapterError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(AdapterError::Uninitialized);
        }
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        self.config
            .lock()
            .as_ref()
            .map_or(true, |c| c.mode == RecognitionMode::Interactive)
    }

    /// Opens the session if none is open. The configuration snapshot is taken
    /// here and never re-read mid-turn.
    fn ensure_session(&self) -> Result<(), AdapterError> {
        if self.link.is_open() {
            return Ok(());
        }
        let config = resolve_session_config(self.site.properties.as_ref())?;
        let session = self.connector.connect(&config)?;
        debug!("opened recognition session, mode={:?}", config.mode);
        *self.config.lock() = Some(config);
        self.link.install(session);
        Ok(())
    }

    fn start_turn(&self, data: &[u8]) -> Result<(), AdapterError> {
        self.ensure_session()?;
        self.send_pre_audio_messages();
        self.uploader.write(&self.link, data);
        Ok(())
    }

    /// Within a turn the wire order is fixed: speech context (control), then
    /// the format prelude (audio, unbuffered), then chunked audio frames.
    fn send_pre_audio_messages(&self) {
        let listen_for = self.site.hints.listen_for_list();
        let intent = self.site.intents.intent_info();
        let no_dgi = self.site.properties.get_bool(PROP_NO_DGI, false);
        let no_intent_json = self.site.properties.get_bool(PROP_NO_INTENT_JSON, false);

        let payload = build_speech_context(&listen_for, &intent, no_dgi, no_intent_json);
        self.expect_intent.store(payload.expect_intent_response, Ordering::SeqCst);
        if let Some(json) = payload.json {
            self.link.send_control(SPEECH_CONTEXT_PATH, json.as_bytes());
        }

        match self.format.lock().clone() {
            Some(fmt) => {
                self.uploader.write(&self.link, &wav_header(&fmt));
                let frame_size = fmt.sample_rate as usize * fmt.block_align as usize
                    * PREFERRED_CHUNK_MS as usize
                    / 1000;
                trace!("preferred frame size for this turn: {frame_size} bytes");
                self.uploader.set_frame_size(frame_size);
            }
            // Sending implies a format was stored; only reachable if state
            // was forced by a misbehaving site.
            None => warn!("send_pre_audio_messages: no stored format"),
        }
    }

    fn on_turn_start(&self, tag: &str) {
        let mut g = self.state.write();
        if g.is_bad() {
            trace!("turn_start: ignoring in state {:?}/{:?}", g.audio, g.service);
            return;
        }
        let from = g.with_service(ServiceState::WaitingForTurnStart);
        if self.state.commit(&mut g, from, from.with_service(ServiceState::WaitingForPhrase)) {
            drop(g);
            self.site.events.started_turn(tag);
        } else {
            warn!("turn_start: unexpected state {:?}/{:?}", g.audio, g.service);
        }
    }

    fn on_speech_start_detected(&self, offset: u64) {
        let g = self.state.read();
        if g.is_bad() {
            trace!("speech_start: ignoring in state {:?}/{:?}", g.audio, g.service);
            return;
        }
        if g.service == ServiceState::WaitingForPhrase {
            drop(g);
            self.site.events.detected_speech_start(offset);
        } else {
            warn!("speech_start: unexpected state {:?}/{:?}", g.audio, g.service);
        }
    }

    /// Speech-end handling flushes the uploader even when the stimulus is
    /// dropped as unexpected; the flush is a guarded passthrough, so in a
    /// torn-down state it goes nowhere.
    fn on_speech_end_detected(&self, offset: u64) {
        let mut g = self.state.write();
        if g.is_bad() {
            trace!("speech_end: ignoring in state {:?}/{:?}", g.audio, g.service);
            drop(g);
            self.uploader.flush(&self.link);
            return;
        }

        let from = StatePair::new(AudioState::Sending, g.service);
        let request_idle = self.single_shot.load(Ordering::SeqCst)
            && self.state.commit(&mut g, from, from.with_audio(AudioState::Stopping));

        let accepted = g.service_between(ServiceState::WaitingForPhrase, ServiceState::WaitingForTurnEnd)
            && matches!(g.audio, AudioState::Idle | AudioState::Sending | AudioState::Stopping);
        if !accepted {
            warn!("speech_end: unexpected state {:?}/{:?}", g.audio, g.service);
        }
        drop(g);

        if accepted {
            self.site.events.detected_speech_end(offset);
        }

        trace!("speech_end: flushing audio");
        self.uploader.flush(&self.link);

        if request_idle && !self.state.snapshot().is_bad() {
            self.site.events.requesting_audio_idle();
        }
    }

    /// Interactive-mode partials only read state, so concurrent audio writes
    /// are not blocked.
    fn on_speech_hypothesis(&self, msg: SpeechHypothesis) {
        let g = self.state.read();
        if g.is_bad() {
            trace!("hypothesis: ignoring in state {:?}/{:?}", g.audio, g.service);
            return;
        }
        if g.service == ServiceState::WaitingForPhrase {
            drop(g);
            self.fire_intermediate(&msg.text, &msg.json, msg.offset);
        } else {
            warn!("hypothesis: unexpected state {:?}/{:?}", g.audio, g.service);
        }
    }

    /// Continuous-mode partials. A fragment arriving while a final phrase is
    /// still waiting on intent means the intent never came: the held phrase
    /// is completed first, then the fragment goes out as an intermediate.
    fn on_speech_fragment(&self, msg: SpeechFragment) {
        debug_assert!(!self.is_interactive(), "fragments only arrive in continuous modes");

        let mut g = self.state.write();
        if g.is_bad() {
            trace!("fragment: ignoring in state {:?}/{:?}", g.audio, g.service);
            return;
        }

        let awaiting = g.with_service(ServiceState::AwaitingIntent);
        if self.state.commit(&mut g, awaiting, awaiting.with_service(ServiceState::DrainingIntent)) {
            debug!("fragment while awaiting intent: intent never arrived");
            drop(g);
            self.correlator.complete(&self.site, "");

            let mut g = self.state.write();
            let draining = g.with_service(ServiceState::DrainingIntent);
            self.state.commit(&mut g, draining, draining.with_service(ServiceState::WaitingForPhrase));
        } else if g.service == ServiceState::WaitingForPhrase {
            drop(g);
        } else {
            warn!("fragment: unexpected state {:?}/{:?}", g.audio, g.service);
            return;
        }

        self.fire_intermediate(&msg.text, &msg.json, msg.offset);
    }

    fn on_speech_phrase(&self, msg: SpeechPhrase) {
        let mut g = self.state.write();
        if g.is_bad() {
            trace!("phrase: ignoring in state {:?}/{:?}", g.audio, g.service);
            return;
        }

        let interactive = self.is_interactive();
        let waiting = g.with_service(ServiceState::WaitingForPhrase);
        if self.expect_intent.load(Ordering::SeqCst)
            && msg.status == RecognitionStatus::Success
            && self.state.commit(&mut g, waiting, waiting.with_service(ServiceState::AwaitingIntent))
        {
            drop(g);
            self.correlator.remember(msg);
        } else if (interactive
            && self.state.commit(&mut g, waiting, waiting.with_service(ServiceState::WaitingForTurnEnd)))
            || (!interactive && self.state.commit(&mut g, waiting, waiting))
        {
            drop(g);
            fire_final_now(&self.site, &msg, "");
        } else {
            warn!("phrase: unexpected state {:?}/{:?}", g.audio, g.service);
        }
    }

    fn on_translation_hypothesis(&self, msg: TranslationHypothesis) {
        let g = self.state.read();
        if g.is_bad() {
            trace!("translation_hypothesis: ignoring in state {:?}/{:?}", g.audio, g.service);
            return;
        }
        if g.service == ServiceState::WaitingForPhrase {
            drop(g);
            let mut result = self
                .site
                .results
                .create_intermediate(&msg.text, ResultKind::TranslationText);
            result.json = msg.json.clone();
            result.init_translation_text(
                msg.translation.status,
                msg.translation.translations,
                msg.translation.failure_reason,
            );
            self.site.events.intermediate_result(msg.offset, result);
        } else {
            warn!("translation_hypothesis: unexpected state {:?}/{:?}", g.audio, g.service);
        }
    }

    fn on_translation_phrase(&self, msg: TranslationPhrase) {
        let mut g = self.state.write();
        if g.is_bad() {
            trace!("translation_phrase: ignoring in state {:?}/{:?}", g.audio, g.service);
            return;
        }

        let interactive = self.is_interactive();
        let waiting = g.with_service(ServiceState::WaitingForPhrase);
        let accepted = (interactive
            && self.state.commit(&mut g, waiting, waiting.with_service(ServiceState::WaitingForTurnEnd)))
            || (!interactive && self.state.commit(&mut g, waiting, waiting));
        if accepted {
            drop(g);
            trace!("translation_phrase: status={:?} text='{}'", msg.status, msg.text);
            let mut result = self.site.results.create_final(&msg.text, ResultKind::TranslationText);
            result.json = msg.json.clone();
            result.init_translation_text(
                msg.translation.status,
                msg.translation.translations,
                msg.translation.failure_reason,
            );
            self.site.events.final_result(msg.offset, result);
        } else {
            warn!("translation_phrase: unexpected state {:?}/{:?}", g.audio, g.service);
        }
    }

    /// Synthesized audio is a passthrough to the site; only teardown gates it.
    fn on_translation_synthesis(&self, audio: Vec<u8>) {
        if self.state.snapshot().is_bad() {
            trace!("translation_synthesis: ignoring, adapter torn down");
            return;
        }
        let mut result = self.site.results.create_final("", ResultKind::TranslationSynthesis);
        result.init_synthesis(TranslationSynthesisStatus::Success, audio, String::new());
        self.site.events.translation_synthesis(result);
    }

    fn on_translation_synthesis_end(&self, status: SynthesisStatus, failure_reason: &str) {
        if self.state.snapshot().is_bad() {
            trace!("translation_synthesis_end: ignoring, adapter torn down");
            return;
        }
        let mut result = self.site.results.create_final("", ResultKind::TranslationSynthesis);
        result.init_synthesis(synthesis_end_status(status), Vec::new(), failure_reason.to_string());
        self.site.events.translation_synthesis(result);
    }

    fn on_turn_end(&self) {
        let mut g = self.state.write();
        if g.is_bad() {
            trace!("turn_end: ignoring in state {:?}/{:?}", g.audio, g.service);
            return;
        }

        let single_shot = self.single_shot.load(Ordering::SeqCst);
        let sending = StatePair::new(AudioState::Sending, g.service);
        let prepare_ready = !single_shot
            && self.state.commit(&mut g, sending, sending.with_audio(AudioState::Ready));
        let sending = StatePair::new(AudioState::Sending, g.service);
        let request_idle = single_shot
            && self.state.commit(&mut g, sending, sending.with_audio(AudioState::Stopping));

        let interactive = self.is_interactive();
        let mut turn_stopped = false;

        let ending = g.with_service(ServiceState::WaitingForTurnEnd);
        let waiting = g.with_service(ServiceState::WaitingForPhrase);
        let awaiting = g.with_service(ServiceState::AwaitingIntent);
        if (interactive && self.state.commit(&mut g, ending, ending.with_service(ServiceState::Idle)))
            || (!interactive && self.state.commit(&mut g, waiting, waiting.with_service(ServiceState::Idle)))
        {
            turn_stopped = true;
        } else if self.state.commit(&mut g, awaiting, awaiting.with_service(ServiceState::DrainingIntent)) {
            debug!("turn ended while awaiting intent: draining held phrase");
            turn_stopped = true;
            drop(g);
            self.correlator.complete(&self.site, "");

            g = self.state.write();
            let draining = g.with_service(ServiceState::DrainingIntent);
            self.state.commit(&mut g, draining, draining.with_service(ServiceState::Idle));
        } else {
            warn!("turn_end: unexpected state {:?}/{:?}", g.audio, g.service);
        }

        let still_good = !g.is_bad();
        drop(g);

        // Re-arming may reconnect; the connect must happen off-lock.
        let mut rearm_error = None;
        if prepare_ready && still_good {
            trace!("turn_end: re-arming audio-ready state");
            self.uploader.set_frame_size(0);
            rearm_error = self.ensure_session().err();
        }

        if turn_stopped {
            self.site.events.stopped_turn();
        }
        if request_idle {
            trace!("turn_end: flushing audio");
            self.uploader.flush(&self.link);
            self.site.events.requesting_audio_idle();
        }
        if let Some(err) = rearm_error {
            self.site.events.error(&err.to_string());
        }
    }

    fn on_error(&self, message: &str) {
        let mut g = self.state.write();
        if g.is_bad() {
            trace!("error: ignoring in state {:?}/{:?}", g.audio, g.service);
            return;
        }

        let cur = *g;
        let ready = StatePair::new(AudioState::Ready, ServiceState::Idle);
        if self.should_reset_after_error() && self.state.commit(&mut g, cur, ready) {
            drop(g);
            debug!("service error, resetting: {message}");
            self.site.events.error(message);

            // Drop the session; the next audio reopens it lazily.
            drop(self.link.take());
            self.uploader.set_frame_size(0);
        } else {
            let cur = *g;
            if self.state.commit(&mut g, cur, cur.with_service(ServiceState::Error)) {
                drop(g);
                debug!("service error: {message}");
                self.site.events.error(message);
            } else {
                warn!("error: unexpected state {:?}/{:?}", g.audio, g.service);
            }
        }
    }

    fn should_reset_after_error(&self) -> bool {
        self.site.properties.get_bool(PROP_RESET_AFTER_ERROR, false)
            && self.format.lock().is_some()
    }

    fn on_user_message(&self, path: &str, _content_type: &str, body: &[u8]) {
        if path != RESPONSE_PATH {
            trace!("user_message: ignoring path '{path}'");
            return;
        }
        let g = self.state.read();
        if g.service == ServiceState::AwaitingIntent {
            drop(g);
            let intent_json = String::from_utf8_lossy(body).into_owned();
            debug!("intent response arrived ({} bytes)", intent_json.len());
            self.correlator.complete(&self.site, &intent_json);
        } else {
            warn!("user_message: unexpected state {:?}/{:?}", g.audio, g.service);
        }
    }

    fn fire_intermediate(&self, text: &str, json: &str, offset: u64) {
        let mut result = self.site.results.create_intermediate(text, ResultKind::Speech);
        result.json = json.to_string();
        self.site.events.intermediate_result(offset, result);
    }
}
