//! Secret store abstraction for VaultGate.
//!
//! This module provides a trait-based interface for credential backends
//! (in-memory, a local JSON file, the OS keyring) and a registry that
//! selects the most secure usable backend at construction time.
//!
//! # Design Principles
//! - Backend isolation: no platform checks in the credential layer
//! - Async operations: all I/O operations are async
//! - Atomic batches: multi-key updates go through `SecretStore::apply`

pub mod local;
pub mod memory;
#[cfg(feature = "keyring")]
pub mod os_keyring;
pub mod provider;
pub mod registry;
pub mod sequential;

pub use local::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "keyring")]
pub use os_keyring::KeyringStore;
pub use provider::{SecretStore, StoreOp};
pub use registry::{create_default_registry, select_store, StoreFactory, StoreRegistry, DEFAULT_PREFERENCE};
