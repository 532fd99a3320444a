//! Test doubles shared across vault integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vaultgate_common::{PlatformError, Result};
use vaultgate_crypto::KdfParams;
use vaultgate_storage::{MemoryStore, SecretStore};
use vaultgate_vault::{BiometricService, GateConfig, VaultGate};

/// Biometric service that answers from a script.
///
/// Each `authenticate` call pops the next scripted answer; an empty script
/// answers `false`. Prompt reasons are recorded.
#[derive(Default)]
pub struct ScriptedBiometrics {
    hardware: AtomicBool,
    answers: Mutex<VecDeque<Result<bool>>>,
    reasons: Mutex<Vec<String>>,
    prompts: AtomicUsize,
}

impl ScriptedBiometrics {
    pub fn with_hardware() -> Arc<Self> {
        let service = Self::default();
        service.hardware.store(true, Ordering::SeqCst);
        Arc::new(service)
    }

    pub fn without_hardware() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, accept: bool) {
        self.answers.lock().unwrap().push_back(Ok(accept));
    }

    pub fn fail_next(&self) {
        self.answers
            .lock()
            .unwrap()
            .push_back(Err(PlatformError::HardwareUnavailable.into()));
    }

    pub fn set_hardware(&self, present: bool) {
        self.hardware.store(present, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().unwrap().clone()
    }
}

#[async_trait]
impl BiometricService for ScriptedBiometrics {
    async fn has_hardware(&self) -> Result<bool> {
        Ok(self.hardware.load(Ordering::SeqCst))
    }

    async fn authenticate(&self, reason: &str) -> Result<bool> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.reasons.lock().unwrap().push(reason.to_string());
        self.answers.lock().unwrap().pop_front().unwrap_or(Ok(false))
    }
}

/// Default configuration with cheap hashing.
pub fn test_config() -> GateConfig {
    GateConfig {
        kdf: KdfParams::testing(),
        ..GateConfig::default()
    }
}

/// Mount a gate on `store` with the test configuration.
pub async fn mount(store: &MemoryStore, biometrics: Arc<ScriptedBiometrics>) -> VaultGate {
    let store: Arc<dyn SecretStore> = Arc::new(store.clone());
    VaultGate::mount(store, biometrics, test_config())
        .await
        .expect("mount")
}

/// Mount a fresh gate and create `pin`, leaving the vault locked.
pub async fn locked_vault(
    pin: &str,
    biometrics: Arc<ScriptedBiometrics>,
) -> (VaultGate, MemoryStore) {
    let store = MemoryStore::new();
    let gate = mount(&store, biometrics).await;
    gate.setup_pin(pin, pin).await.expect("setup");
    assert!(gate.lock().await);
    (gate, store)
}
