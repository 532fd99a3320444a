//! Unlock session tracking.
//!
//! Every transition into `Unlocked` opens a new session with a fresh handle.
//! Locking ends it. Consumers use the handle to tell one unlock apart from
//! the next, e.g. to drop cached document thumbnails from an earlier session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session handle for tracking unlock sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(String);

impl SessionHandle {
    /// Generate a new unique session handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the handle string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// How the vault was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockMethod {
    /// Correct PIN entered.
    Pin,
    /// Platform biometric challenge succeeded.
    Biometric,
    /// A new PIN was just created.
    Setup,
}

/// One continuous unlocked period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockSession {
    handle: SessionHandle,
    method: UnlockMethod,
    started_at: DateTime<Utc>,
}

impl UnlockSession {
    /// Open a session now.
    pub fn start(method: UnlockMethod) -> Self {
        Self {
            handle: SessionHandle::new(),
            method,
            started_at: Utc::now(),
        }
    }

    /// Get the session handle.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Get the unlock method.
    pub fn method(&self) -> UnlockMethod {
        self.method
    }

    /// Wall-clock start time.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
