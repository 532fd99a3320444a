//! Store registry for backend selection.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::provider::SecretStore;
use vaultgate_common::{Error, PlatformError, Result};

/// Factory function type for creating stores.
pub type StoreFactory = Box<dyn Fn(&Value) -> Result<Arc<dyn SecretStore>> + Send + Sync>;

/// Backends tried by [`select_store`] when the caller has no preference:
/// the OS keyring first, then the plain file.
pub const DEFAULT_PREFERENCE: &[&str] = &["keyring", "file"];

/// Registry for secret store factories.
///
/// Allows registration and resolution of backends by name and
/// configuration, so the credential layer never branches on platform.
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a store factory.
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: StoreFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::Config(format!(
                "Store '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a store by name and configuration.
    ///
    /// # Errors
    /// - Store not registered
    /// - Configuration invalid for the store
    pub fn resolve(&self, name: &str, config: &Value) -> Result<Arc<dyn SecretStore>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::Config(format!("Store '{}' is not registered", name)))?;
        factory(config)
    }

    /// Get list of registered store names.
    pub fn stores(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a store is registered.
    pub fn has_store(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the built-in backends.
///
/// - `memory`: no configuration
/// - `file`: requires `{"path": "..."}`
/// - `keyring` (feature `keyring`): optional `{"service": "..."}`
pub fn create_default_registry() -> Result<StoreRegistry> {
    let mut registry = StoreRegistry::new();

    registry.register(
        "memory",
        Box::new(|_config| Ok(Arc::new(crate::memory::MemoryStore::new()))),
    )?;

    registry.register(
        "file",
        Box::new(|config| {
            let path = config
                .get("path")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::Config("File store requires 'path'".to_string()))?;
            Ok(Arc::new(crate::local::FileStore::new(path)?))
        }),
    )?;

    #[cfg(feature = "keyring")]
    registry.register(
        "keyring",
        Box::new(|config| {
            let service = config
                .get("service")
                .and_then(|v| v.as_str())
                .unwrap_or(crate::os_keyring::DEFAULT_SERVICE);
            Ok(Arc::new(crate::os_keyring::KeyringStore::new(service)))
        }),
    )?;

    Ok(registry)
}

/// Pick the first backend in `preference` that resolves and probes
/// successfully on this device.
///
/// Names that are not registered (e.g. `keyring` without the feature) are
/// skipped.
///
/// # Errors
/// - `PlatformUnavailable(StoreUnavailable)` when no backend is usable
pub async fn select_store(
    registry: &StoreRegistry,
    preference: &[&str],
    config: &Value,
) -> Result<Arc<dyn SecretStore>> {
    for name in preference {
        if !registry.has_store(name) {
            debug!("Store '{}' not registered, skipping", name);
            continue;
        }
        match registry.resolve(name, config) {
            Ok(store) if store.probe().await => {
                info!(
                    "Using '{}' credential store (secure: {})",
                    store.name(),
                    store.is_secure()
                );
                return Ok(store);
            }
            Ok(_) => debug!("Store '{}' failed its probe, skipping", name),
            Err(e) => debug!("Store '{}' could not be created: {}", name, e),
        }
    }

    Err(PlatformError::StoreUnavailable(format!(
        "none of [{}] is usable",
        preference.join(", ")
    ))
    .into())
}
