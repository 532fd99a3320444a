//! Lock subsystem configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use vaultgate_common::{Error, PinRules, Result, PIN_MAX_LEN, PIN_MIN_LEN};
use vaultgate_crypto::KdfParams;

/// Default number of wrong PINs before the lockout response.
pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 3;

/// Default capacity of the lock event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// What happens when the failed-attempt threshold is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LockoutMode {
    /// Show the lockout message and reset the counter. The next attempt is
    /// accepted immediately.
    Advisory,
    /// Reject PIN attempts for `seconds` after the threshold.
    ///
    /// The deadline is held by the mounted gate only, like the attempt
    /// counter. Mounting a new gate starts without a cooldown.
    Cooldown {
        /// Cooldown length.
        seconds: u64,
    },
}

impl LockoutMode {
    /// Cooldown length, if any.
    pub fn cooldown(&self) -> Option<Duration> {
        match self {
            LockoutMode::Advisory => None,
            LockoutMode::Cooldown { seconds } => Some(Duration::from_secs(*seconds)),
        }
    }
}

impl Default for LockoutMode {
    fn default() -> Self {
        LockoutMode::Advisory
    }
}

/// Configuration for a vault gate.
///
/// Every field has a default, so a partial JSON document is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Minimum PIN length.
    pub pin_min_len: usize,
    /// Maximum PIN length.
    pub pin_max_len: usize,
    /// Wrong PINs before the lockout response.
    pub max_failed_attempts: u32,
    /// Lockout response.
    pub lockout: LockoutMode,
    /// Argon2id parameters for newly stored PINs.
    pub kdf: KdfParams,
    /// Reason shown by the platform prompt when unlocking.
    pub biometric_prompt: String,
    /// Reason shown when the user turns biometric unlock on.
    pub biometric_enable_prompt: String,
    /// Buffered lock events per subscriber.
    pub event_capacity: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            pin_min_len: PIN_MIN_LEN,
            pin_max_len: PIN_MAX_LEN,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout: LockoutMode::Advisory,
            kdf: KdfParams::moderate(),
            biometric_prompt: "Unlock Vault".to_string(),
            biometric_enable_prompt: "Enable biometric unlock for Vault".to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl GateConfig {
    /// Check that the values are usable together.
    ///
    /// # Errors
    /// - PIN bounds invalid
    /// - Zero attempts, zero cooldown or zero event capacity
    pub fn validate(&self) -> Result<()> {
        self.pin_rules()?;
        if self.max_failed_attempts == 0 {
            return Err(Error::Config(
                "max_failed_attempts must be at least 1".to_string(),
            ));
        }
        if let LockoutMode::Cooldown { seconds: 0 } = self.lockout {
            return Err(Error::Config("Cooldown must be at least 1 second".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// PIN rules derived from the length bounds.
    pub fn pin_rules(&self) -> Result<PinRules> {
        PinRules::new(self.pin_min_len, self.pin_max_len)
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize and validate configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
