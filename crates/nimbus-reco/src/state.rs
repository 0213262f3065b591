//! Two-axis turn state and the single transition primitive
//!
//! The adapter's lifecycle is the pair `(AudioState, ServiceState)`. Every
//! mutation goes through [`StatePair::transition`], a pure function, committed
//! under the one reader/writer lock owned by [`TurnState`]. No other code may
//! assign either axis.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

/// Audio-side state: what the site's audio feed is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AudioState {
    Idle,
    Ready,
    Sending,
    Stopping,
}

/// Service-side state: where the wire protocol stands within a turn.
///
/// Declaration order matters: range checks such as "between `WaitingForPhrase`
/// and `WaitingForTurnEnd`" rely on the derived ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceState {
    Idle,
    WaitingForTurnStart,
    WaitingForPhrase,
    AwaitingIntent,
    DrainingIntent,
    WaitingForTurnEnd,
    Error,
    Terminating,
    Zombie,
}

/// The guarded pair. `Zombie` is terminal; `Error`, `Terminating`, and
/// `Zombie` can only be left along `Error -> Terminating -> Zombie`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatePair {
    pub audio: AudioState,
    pub service: ServiceState,
}

impl StatePair {
    pub const IDLE: StatePair = StatePair {
        audio: AudioState::Idle,
        service: ServiceState::Idle,
    };

    pub fn new(audio: AudioState, service: ServiceState) -> Self {
        Self { audio, service }
    }

    /// Same audio axis, different service axis.
    pub fn with_service(self, service: ServiceState) -> Self {
        Self { service, ..self }
    }

    /// Same service axis, different audio axis.
    pub fn with_audio(self, audio: AudioState) -> Self {
        Self { audio, ..self }
    }

    /// Bad states drop every stimulus at ingress.
    pub fn is_bad(&self) -> bool {
        matches!(
            self.service,
            ServiceState::Error | ServiceState::Terminating | ServiceState::Zombie
        )
    }

    /// Inclusive range check on the service axis.
    pub fn service_between(&self, lo: ServiceState, hi: ServiceState) -> bool {
        self.service >= lo && self.service <= hi
    }

    /// The transition primitive. Returns the committed pair iff:
    ///
    /// 1. `self` equals `from`, and
    /// 2. `from.service` is not a bad state, unless the transition is a
    ///    service self-loop, `Error -> Terminating`, or
    ///    `Terminating -> Zombie`.
    ///
    /// Otherwise `None`, and the caller must leave the state untouched.
    pub fn transition(self, from: StatePair, to: StatePair) -> Option<StatePair> {
        if self != from {
            return None;
        }
        let may_leave = !from.is_bad()
            || from.service == to.service
            || (from.service == ServiceState::Error && to.service == ServiceState::Terminating)
            || (from.service == ServiceState::Terminating && to.service == ServiceState::Zombie);
        may_leave.then_some(to)
    }
}

/// Owner of the state pair: one `RwLock` plus a transition feed for
/// observers. Writers hold `write()` for any mutation; event paths that only
/// read state before firing site callbacks hold `read()`.
pub(crate) struct TurnState {
    pair: RwLock<StatePair>,
    tx: Sender<StatePair>,
    rx: Receiver<StatePair>,
}

impl TurnState {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            pair: RwLock::new(StatePair::IDLE),
            tx,
            rx,
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, StatePair> {
        self.pair.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, StatePair> {
        self.pair.write()
    }

    /// Snapshot without holding a guard.
    pub fn snapshot(&self) -> StatePair {
        *self.pair.read()
    }

    pub fn subscribe(&self) -> Receiver<StatePair> {
        self.rx.clone()
    }

    /// Commit `from -> to` through the guard the caller already holds.
    /// Publishes the new pair to subscribers on success.
    pub fn commit(&self, guard: &mut StatePair, from: StatePair, to: StatePair) -> bool {
        match guard.transition(from, to) {
            Some(next) => {
                trace!(
                    "state transition: {:?}/{:?} -> {:?}/{:?}",
                    from.audio,
                    from.service,
                    next.audio,
                    next.service
                );
                *guard = next;
                let _ = self.tx.send(next);
                true
            }
            None => false,
        }
    }
}
