//! Guarded facade over the transport session
//!
//! Every outbound call checks the service axis first: once the adapter is
//! `Terminating` or `Zombie`, or the session is gone, traffic is dropped
//! silently. Transport-level failures surface asynchronously through the
//! event channel, never through return codes here.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::state::{ServiceState, TurnState};
use crate::transport::RecoSession;

pub(crate) struct ServiceLink {
    state: Arc<TurnState>,
    session: Mutex<Option<Arc<dyn RecoSession>>>,
}

impl ServiceLink {
    pub fn new(state: Arc<TurnState>) -> Self {
        Self {
            state,
            session: Mutex::new(None),
        }
    }

    pub fn install(&self, session: Arc<dyn RecoSession>) {
        *self.session.lock() = Some(session);
    }

    /// Removes the session; dropping the returned handle closes it.
    pub fn take(&self) -> Option<Arc<dyn RecoSession>> {
        self.session.lock().take()
    }

    pub fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    /// The guarded passthrough check shared by all three sends.
    fn usable(&self, what: &str) -> Option<Arc<dyn RecoSession>> {
        let service = self.state.snapshot().service;
        if matches!(service, ServiceState::Terminating | ServiceState::Zombie) {
            trace!("{what}: dropped, service state is {service:?}");
            return None;
        }
        let session = self.session.lock().clone();
        if session.is_none() {
            trace!("{what}: dropped, no open session");
        }
        session
    }

    pub fn send_control(&self, path: &str, body: &[u8]) {
        if let Some(session) = self.usable("send_control") {
            trace!("sending control message '{}' ({} bytes)", path, body.len());
            session.send_message(path, body);
        }
    }

    pub fn send_audio(&self, bytes: &[u8]) {
        if let Some(session) = self.usable("send_audio") {
            session.write_audio(bytes);
        }
    }

    pub fn flush_audio(&self) {
        if let Some(session) = self.usable("flush_audio") {
            session.flush_audio();
        }
    }
}
