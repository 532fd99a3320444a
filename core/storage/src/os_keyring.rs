//! OS credential store backend.
//!
//! Each logical key becomes one keyring entry under a shared service name.
//! The platform APIs are blocking, so every call runs on the blocking pool.
//! Keyring entries cannot be updated together; `apply` runs ops in order
//! and restores the touched entries when one fails.

use async_trait::async_trait;
use tracing::debug;

use crate::provider::{SecretStore, StoreOp};
use crate::sequential::{apply_with_rollback, KeyValueOps};
use vaultgate_common::{Error, Result};

/// Service name used when the configuration does not name one.
pub const DEFAULT_SERVICE: &str = "vaultgate";

const PROBE_KEY: &str = "__vaultgate_probe";

/// Secret store backed by the platform keyring.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Create a store for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Service name entries are filed under.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(service: &str, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(service, key).map_err(|e| Error::Storage(format!("keyring: {}", e)))
    }

    fn get_blocking(service: &str, key: &str) -> Result<Option<String>> {
        match Self::entry(service, key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Storage(format!("keyring: {}", e))),
        }
    }

    fn put_blocking(service: &str, key: &str, value: &str) -> Result<()> {
        Self::entry(service, key)?
            .set_password(value)
            .map_err(|e| Error::Storage(format!("keyring: {}", e)))
    }

    fn delete_blocking(service: &str, key: &str) -> Result<()> {
        match Self::entry(service, key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(format!("keyring: {}", e))),
        }
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&str) -> Result<T> + Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || f(&service))
            .await
            .map_err(|e| Error::Storage(format!("keyring task failed: {}", e)))?
    }
}

/// Blocking entry access for one service name.
struct ServiceEntries<'a> {
    service: &'a str,
}

impl KeyValueOps for ServiceEntries<'_> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        KeyringStore::get_blocking(self.service, key)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        KeyringStore::put_blocking(self.service, key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        KeyringStore::delete_blocking(self.service, key)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

#[async_trait]
impl SecretStore for KeyringStore {
    fn name(&self) -> &str {
        "keyring"
    }

    fn is_secure(&self) -> bool {
        true
    }

    async fn probe(&self) -> bool {
        let result = self
            .run_blocking(|service| Self::get_blocking(service, PROBE_KEY))
            .await;
        match result {
            Ok(_) => true,
            Err(e) => {
                debug!("Keyring probe failed: {}", e);
                false
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.run_blocking(move |service| Self::get_blocking(service, &key))
            .await
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = zeroize::Zeroizing::new(value.to_string());
        self.run_blocking(move |service| Self::put_blocking(service, &key, &value))
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.run_blocking(move |service| Self::delete_blocking(service, &key))
            .await
    }

    async fn apply(&self, batch: &[StoreOp]) -> Result<()> {
        let batch = batch.to_vec();
        self.run_blocking(move |service| {
            apply_with_rollback(&ServiceEntries { service }, &batch)
        })
        .await
    }
}
