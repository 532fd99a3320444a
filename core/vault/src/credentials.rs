//! Durable vault credentials.
//!
//! Three logical keys live in the secret store: the PIN record, the
//! biometric flag and the auto-lock preference. The PIN is stored only as a
//! salted Argon2id hash wrapped in a [`PinRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::policy::AutoLockPolicy;
use vaultgate_common::{Error, Pin, PinRules, PreconditionError, Result};
use vaultgate_crypto::{KdfParams, PinHash};
use vaultgate_storage::{SecretStore, StoreOp};

/// Store key for the PIN record.
pub const PIN_KEY: &str = "vault.pin";

/// Store key for the biometric-enabled flag.
pub const BIOMETRIC_KEY: &str = "vault.biometric_enabled";

/// Store key for the auto-lock preference.
pub const AUTO_LOCK_KEY: &str = "vault.auto_lock_timeout";

/// Persisted PIN credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinRecord {
    /// Salted hash of the PIN.
    pub hash: PinHash,
    /// First time a PIN was set.
    pub created_at: DateTime<Utc>,
    /// Last time the PIN changed.
    pub modified_at: DateTime<Utc>,
}

impl PinRecord {
    fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Point-in-time view of the stored preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSnapshot {
    /// A PIN is set.
    pub has_pin: bool,
    /// Biometric unlock is on (always false without a PIN).
    pub biometric_enabled: bool,
    /// Auto-lock preference.
    pub auto_lock_policy: AutoLockPolicy,
}

/// Credential access on top of one [`SecretStore`].
///
/// Verification is a pure read; attempt counting belongs to the lock state
/// machine.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn SecretStore>,
    rules: PinRules,
    kdf: KdfParams,
}

impl CredentialStore {
    /// Create a credential store.
    pub fn new(store: Arc<dyn SecretStore>, rules: PinRules, kdf: KdfParams) -> Self {
        Self { store, rules, kdf }
    }

    /// Underlying backend.
    pub fn backend(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    /// PIN rules applied on write.
    pub fn rules(&self) -> &PinRules {
        &self.rules
    }

    async fn load_record(&self) -> Result<Option<PinRecord>> {
        match self.store.get(PIN_KEY).await? {
            Some(json) => PinRecord::from_json(&json).map(Some),
            None => Ok(None),
        }
    }

    /// Check whether a PIN is set.
    pub async fn has_pin(&self) -> Result<bool> {
        Ok(self.store.get(PIN_KEY).await?.is_some())
    }

    /// Validate and store a PIN.
    ///
    /// # Postconditions
    /// - The biometric flag is left as it was
    ///
    /// # Errors
    /// - `Validation` if `pin` breaks the rules (nothing is written)
    /// - Storage failure (previous PIN stays in effect)
    pub async fn set_pin(&self, pin: &str) -> Result<()> {
        let pin = Pin::parse(pin, &self.rules)?;
        self.store_pin(&pin).await
    }

    /// Store an already validated PIN.
    pub async fn store_pin(&self, pin: &Pin) -> Result<()> {
        let previous = self.load_record().await.ok().flatten();
        let hash = hash_pin(pin.clone(), self.kdf.clone()).await?;
        let now = Utc::now();
        let record = PinRecord {
            hash,
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            modified_at: now,
        };

        self.store
            .put(PIN_KEY, &record.to_json()?)
            .await
            .inspect_err(|e| error!("Failed to store PIN: {}", e))?;
        info!("Vault PIN stored");
        Ok(())
    }

    /// Compare a candidate against the stored PIN.
    ///
    /// Candidates that could never be a valid PIN simply do not match.
    ///
    /// # Returns
    /// - `Ok(false)` when no PIN is set
    pub async fn verify_pin(&self, candidate: &str) -> Result<bool> {
        match Pin::parse(candidate, &self.rules) {
            Ok(pin) => self.verify(&pin).await,
            Err(_) => Ok(false),
        }
    }

    /// Compare a parsed candidate against the stored PIN.
    pub async fn verify(&self, candidate: &Pin) -> Result<bool> {
        let Some(record) = self.load_record().await? else {
            return Ok(false);
        };
        verify_hash(record.hash, candidate.clone()).await
    }

    /// Delete the PIN and turn biometric unlock off.
    ///
    /// Both keys change in one batch. The flag is cleared first, so a backend
    /// that cannot apply the batch atomically never ends up with biometric
    /// enabled and no PIN.
    pub async fn remove_pin(&self) -> Result<()> {
        self.store
            .apply(&[StoreOp::put(BIOMETRIC_KEY, "false"), StoreOp::delete(PIN_KEY)])
            .await
            .inspect_err(|e| error!("Failed to remove PIN: {}", e))?;
        info!("Vault PIN removed, biometric unlock disabled");
        Ok(())
    }

    /// Whether biometric unlock is on.
    ///
    /// A stored `true` without a PIN reads as `false`.
    pub async fn biometric_enabled(&self) -> Result<bool> {
        let flag = self.store.get(BIOMETRIC_KEY).await?;
        if flag.as_deref() != Some("true") {
            return Ok(false);
        }
        self.has_pin().await
    }

    /// Turn biometric unlock on or off.
    ///
    /// # Errors
    /// - `Precondition(NoPinSet)` when enabling without a PIN
    pub async fn set_biometric_enabled(&self, enabled: bool) -> Result<()> {
        if enabled && !self.has_pin().await? {
            return Err(PreconditionError::NoPinSet.into());
        }
        let value = if enabled { "true" } else { "false" };
        self.store.put(BIOMETRIC_KEY, value).await?;
        debug!("Biometric unlock set to {}", enabled);
        Ok(())
    }

    /// Read the auto-lock preference.
    pub async fn auto_lock_policy(&self) -> Result<AutoLockPolicy> {
        let value = self.store.get(AUTO_LOCK_KEY).await?;
        Ok(AutoLockPolicy::from_store_value(value.as_deref()))
    }

    /// Write the auto-lock preference.
    ///
    /// # Errors
    /// - `Config` for minute values outside [`crate::policy::ALLOWED_MINUTES`]
    ///   (nothing is written)
    pub async fn set_auto_lock_policy(&self, policy: AutoLockPolicy) -> Result<()> {
        let policy = policy.validate()?;
        self.store
            .put(AUTO_LOCK_KEY, &policy.to_store_value())
            .await?;
        debug!("Auto-lock policy set to {}", policy.to_store_value());
        Ok(())
    }

    /// Read all preferences at once.
    pub async fn snapshot(&self) -> Result<CredentialSnapshot> {
        let has_pin = self.has_pin().await?;
        let biometric_enabled =
            has_pin && self.store.get(BIOMETRIC_KEY).await?.as_deref() == Some("true");
        Ok(CredentialSnapshot {
            has_pin,
            biometric_enabled,
            auto_lock_policy: self.auto_lock_policy().await?,
        })
    }

    /// Timestamps of the stored PIN, if any.
    pub async fn pin_record(&self) -> Result<Option<PinRecord>> {
        self.load_record().await
    }
}

// Argon2id is CPU bound; keep it off the async workers.
async fn hash_pin(pin: Pin, kdf: KdfParams) -> Result<PinHash> {
    tokio::task::spawn_blocking(move || PinHash::new(&pin, kdf))
        .await
        .map_err(|e| Error::Crypto(format!("Hashing task failed: {}", e)))?
}

async fn verify_hash(hash: PinHash, candidate: Pin) -> Result<bool> {
    tokio::task::spawn_blocking(move || hash.verify(&candidate))
        .await
        .map_err(|e| Error::Crypto(format!("Verification task failed: {}", e)))?
}
