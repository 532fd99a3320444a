//! In-memory secret store for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::provider::{SecretStore, StoreOp};
use vaultgate_common::{Error, Result};

/// In-memory secret store.
///
/// Useful for testing and for platforms where nothing may touch disk. All
/// data is lost on drop. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    storage: Arc<RwLock<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise storage-failure paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.storage.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("Write rejected by memory store".to_string()));
        }
        Ok(())
    }

    fn poisoned<T>(_: T) -> Error {
        Error::Storage("Memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_secure(&self) -> bool {
        false
    }

    async fn probe(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let storage = self.storage.read().map_err(Self::poisoned)?;
        Ok(storage.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        let mut storage = self.storage.write().map_err(Self::poisoned)?;
        storage.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        let mut storage = self.storage.write().map_err(Self::poisoned)?;
        storage.remove(key);
        Ok(())
    }

    async fn apply(&self, batch: &[StoreOp]) -> Result<()> {
        self.check_writable()?;
        // Single write guard: readers see the batch entirely or not at all.
        let mut storage = self.storage.write().map_err(Self::poisoned)?;
        for op in batch {
            match op {
                StoreOp::Put { key, value } => {
                    storage.insert(key.clone(), value.clone());
                }
                StoreOp::Delete { key } => {
                    storage.remove(key);
                }
            }
        }
        Ok(())
    }
}
