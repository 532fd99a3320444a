//! Auto-lock timeout preference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use vaultgate_common::{Error, Result};

/// Minute values offered to the user.
pub const ALLOWED_MINUTES: [u32; 4] = [1, 5, 15, 30];

/// Minutes used when nothing (or something unrecognised) is stored.
pub const DEFAULT_MINUTES: u32 = 5;

/// When an unlocked vault locks itself again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoLockPolicy {
    /// Lock as soon as the app is backgrounded or the vault screen loses
    /// focus. No inactivity timer.
    Immediate,
    /// Lock after this many minutes without a reset.
    Minutes(u32),
    /// Only lock manually.
    Never,
}

impl AutoLockPolicy {
    /// Build a minutes policy from one of [`ALLOWED_MINUTES`].
    pub fn minutes(minutes: u32) -> Result<Self> {
        if ALLOWED_MINUTES.contains(&minutes) {
            Ok(AutoLockPolicy::Minutes(minutes))
        } else {
            Err(Error::Config(format!(
                "Auto-lock minutes must be one of {:?}, got {}",
                ALLOWED_MINUTES, minutes
            )))
        }
    }

    /// Reject minute values that are not offered.
    pub fn validate(self) -> Result<Self> {
        match self {
            AutoLockPolicy::Minutes(m) => AutoLockPolicy::minutes(m),
            other => Ok(other),
        }
    }

    /// Every selectable policy, in display order.
    pub fn options() -> Vec<Self> {
        let mut options = vec![AutoLockPolicy::Immediate];
        options.extend(ALLOWED_MINUTES.iter().map(|m| AutoLockPolicy::Minutes(*m)));
        options.push(AutoLockPolicy::Never);
        options
    }

    /// Inactivity timeout, if this policy uses a timer.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            AutoLockPolicy::Minutes(m) => Some(Duration::from_secs(u64::from(*m) * 60)),
            AutoLockPolicy::Immediate | AutoLockPolicy::Never => None,
        }
    }

    /// Whether leaving the vault locks it.
    pub fn locks_on_leave(&self) -> bool {
        matches!(self, AutoLockPolicy::Immediate)
    }

    /// Value written to the credential store.
    pub fn to_store_value(&self) -> String {
        match self {
            AutoLockPolicy::Immediate => "0".to_string(),
            AutoLockPolicy::Minutes(m) => m.to_string(),
            AutoLockPolicy::Never => "never".to_string(),
        }
    }

    /// Lenient decoding of a stored value.
    ///
    /// Missing or unrecognised values fall back to the default so a damaged
    /// preference never leaves the vault without an auto-lock.
    pub fn from_store_value(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Human-readable label for settings screens.
    pub fn label(&self) -> String {
        match self {
            AutoLockPolicy::Immediate => "When leaving vault".to_string(),
            AutoLockPolicy::Minutes(1) => "After 1 minute".to_string(),
            AutoLockPolicy::Minutes(m) => format!("After {} minutes", m),
            AutoLockPolicy::Never => "Never".to_string(),
        }
    }
}

impl Default for AutoLockPolicy {
    fn default() -> Self {
        AutoLockPolicy::Minutes(DEFAULT_MINUTES)
    }
}

impl FromStr for AutoLockPolicy {
    type Err = Error;

    /// Strict parsing: `0`/`immediate`, `1`, `5`, `15`, `30`, `never`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "immediate" => Ok(AutoLockPolicy::Immediate),
            "never" => Ok(AutoLockPolicy::Never),
            other => {
                let minutes: u32 = other
                    .parse()
                    .map_err(|_| Error::Config(format!("Unknown auto-lock policy: {}", s)))?;
                AutoLockPolicy::minutes(minutes)
            }
        }
    }
}

impl fmt::Display for AutoLockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
