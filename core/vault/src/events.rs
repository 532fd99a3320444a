//! Lock events published to observers.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::policy::AutoLockPolicy;
use crate::session::{SessionHandle, UnlockMethod};

/// Why the vault locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    /// User pressed lock.
    Manual,
    /// Inactivity timer fired.
    Timeout,
    /// App went to the background under the `Immediate` policy.
    Background,
    /// Vault screen lost focus under the `Immediate` policy.
    FocusLost,
}

/// Observable change in the lock subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LockEvent {
    Unlocked {
        method: UnlockMethod,
        session: SessionHandle,
    },
    Locked {
        reason: LockReason,
    },
    AttemptRejected {
        attempts_remaining: u32,
    },
    LockedOut {
        message: String,
    },
    PinSet,
    PinChanged,
    PinRemoved,
    BiometricChanged {
        enabled: bool,
    },
    PolicyChanged {
        policy: AutoLockPolicy,
    },
}

/// Fan-out channel for [`LockEvent`]s.
///
/// Sending never blocks and never fails the operation that produced the
/// event; slow subscribers see `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LockEvent>,
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<LockEvent> {
        self.tx.subscribe()
    }

    /// Publish an event.
    pub fn emit(&self, event: LockEvent) {
        // No subscribers is fine
        if self.tx.send(event).is_err() {
            trace!("Lock event dropped, no subscribers");
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
