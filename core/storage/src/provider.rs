//! Secret store trait definition.

use async_trait::async_trait;

use vaultgate_common::Result;

/// One write in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Set `key` to `value`.
    Put { key: String, value: String },
    /// Remove `key`. Removing a missing key is not an error.
    Delete { key: String },
}

impl StoreOp {
    /// Build a put.
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        StoreOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build a delete.
    pub fn delete(key: impl Into<String>) -> Self {
        StoreOp::Delete { key: key.into() }
    }

    /// Key touched by this op.
    pub fn key(&self) -> &str {
        match self {
            StoreOp::Put { key, .. } | StoreOp::Delete { key } => key,
        }
    }
}

/// String key-value backend for credentials and preferences.
///
/// Values are opaque strings. Implementations must be safe to share across
/// tasks; the credential layer never holds a backend lock across calls.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Backend name (e.g., "memory", "file", "keyring").
    fn name(&self) -> &str;

    /// Whether values are protected by a platform secret service.
    fn is_secure(&self) -> bool;

    /// Check that the backend can be used on this device.
    async fn probe(&self) -> bool;

    /// Read a value.
    ///
    /// # Returns
    /// `None` when the key has never been written or was deleted.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Missing keys are ignored.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Apply several writes as one logical update.
    ///
    /// # Postconditions
    /// - Backends that can (memory, file) apply all ops or none
    /// - Backends that cannot (keyring) apply ops in order and restore the
    ///   keys already written when an op fails
    async fn apply(&self, batch: &[StoreOp]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_op_key() {
        assert_eq!(StoreOp::put("a", "1").key(), "a");
        assert_eq!(StoreOp::delete("b").key(), "b");
    }
}
