//! Shared vault gate handle.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::biometric::{BiometricGate, BiometricService};
use crate::config::GateConfig;
use crate::credentials::CredentialStore;
use crate::events::{EventBus, LockEvent, LockReason};
use crate::lifecycle::LifecycleEvent;
use crate::machine::{LockState, LockStateMachine, UnlockOutcome, VaultSettings};
use crate::policy::AutoLockPolicy;
use crate::scheduler::AutoLockTarget;
use crate::session::SessionHandle;
use vaultgate_common::Result;
use vaultgate_storage::SecretStore;

struct GateInner {
    machine: Mutex<LockStateMachine>,
    events: EventBus,
}

#[async_trait]
impl AutoLockTarget for GateInner {
    async fn auto_lock_fired(&self, generation: u64) {
        let mut machine = self.machine.lock().await;
        if !machine.on_timer(generation) {
            debug!("Auto-lock fire {} had no effect", generation);
        }
    }
}

/// Handle to one vault's lock subsystem.
///
/// Cloning is cheap; all clones share the same state machine. Every
/// operation holds the machine's mutex for its whole duration, including
/// store I/O and biometric prompts, so operations never interleave.
#[derive(Clone)]
pub struct VaultGate {
    inner: Arc<GateInner>,
}

impl VaultGate {
    /// Mount the gate on a store.
    ///
    /// Reads the stored credentials and, when the vault starts locked with
    /// biometric unlock enabled, runs the one automatic biometric challenge.
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Store read failure
    pub async fn mount(
        store: Arc<dyn SecretStore>,
        biometrics: Arc<dyn BiometricService>,
        config: GateConfig,
    ) -> Result<Self> {
        config.validate()?;
        let events = EventBus::new(config.event_capacity);
        let credentials = CredentialStore::new(store, config.pin_rules()?, config.kdf.clone());
        let mut machine = LockStateMachine::new(
            credentials,
            BiometricGate::new(biometrics),
            config,
            events.clone(),
        )?;
        machine.load().await?;

        let inner = Arc::new(GateInner {
            machine: Mutex::new(machine),
            events,
        });
        let target: Arc<dyn AutoLockTarget> = inner.clone();

        let mut machine = inner.machine.lock().await;
        machine.attach_scheduler(Arc::downgrade(&target));
        machine.auto_biometric().await?;
        drop(machine);

        Ok(Self { inner })
    }

    /// Subscribe to lock events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LockEvent> {
        self.inner.events.subscribe()
    }

    /// Current state.
    pub async fn state(&self) -> LockState {
        self.inner.machine.lock().await.state().clone()
    }

    /// Wrong PINs counted so far.
    pub async fn failed_attempts(&self) -> u32 {
        self.inner.machine.lock().await.failed_attempts()
    }

    /// Handle of the live unlock session.
    pub async fn session(&self) -> Option<SessionHandle> {
        self.inner
            .machine
            .lock()
            .await
            .session()
            .map(|s| s.handle().clone())
    }

    pub async fn setup_pin(&self, pin: &str, confirmation: &str) -> Result<()> {
        self.inner.machine.lock().await.setup_pin(pin, confirmation).await
    }

    pub async fn begin_pin_setup(&self) -> Result<()> {
        self.inner.machine.lock().await.begin_pin_setup()
    }

    pub async fn stage_pin_draft(&self, pin: &str) -> Result<()> {
        self.inner.machine.lock().await.stage_pin_draft(pin)
    }

    pub async fn confirm_pin_draft(&self, confirmation: &str) -> Result<()> {
        self.inner
            .machine
            .lock()
            .await
            .confirm_pin_draft(confirmation)
            .await
    }

    /// Check a PIN from the lock screen. See [`LockStateMachine::verify_pin`].
    pub async fn verify_pin(&self, candidate: &str) -> Result<UnlockOutcome> {
        self.inner.machine.lock().await.verify_pin(candidate).await
    }

    /// User-triggered biometric unlock.
    pub async fn unlock_with_biometric(&self) -> Result<UnlockOutcome> {
        self.inner.machine.lock().await.unlock_with_biometric().await
    }

    /// Manual lock. Returns false if the vault was not unlocked.
    pub async fn lock(&self) -> bool {
        self.inner.machine.lock().await.lock(LockReason::Manual)
    }

    /// Forward an app lifecycle or focus signal.
    pub async fn on_lifecycle(&self, event: LifecycleEvent) -> bool {
        self.inner.machine.lock().await.on_lifecycle(event).await
    }

    /// Restart the inactivity timer.
    pub async fn record_activity(&self) {
        self.inner.machine.lock().await.record_activity()
    }

    pub async fn remove_pin(&self) -> Result<()> {
        self.inner.machine.lock().await.remove_pin().await
    }

    pub async fn change_pin(&self, current: &str, new: &str, confirmation: &str) -> Result<()> {
        self.inner
            .machine
            .lock()
            .await
            .change_pin(current, new, confirmation)
            .await
    }

    pub async fn begin_pin_change(&self) -> Result<()> {
        self.inner.machine.lock().await.begin_pin_change()
    }

    pub async fn verify_current_pin(&self, current: &str) -> Result<()> {
        self.inner
            .machine
            .lock()
            .await
            .verify_current_pin(current)
            .await
    }

    pub async fn commit_pin_change(&self, new: &str, confirmation: &str) -> Result<()> {
        self.inner
            .machine
            .lock()
            .await
            .commit_pin_change(new, confirmation)
            .await
    }

    pub async fn cancel_pin_management(&self) {
        self.inner.machine.lock().await.cancel_pin_management()
    }

    pub async fn set_biometric_enabled(&self, enabled: bool) -> Result<()> {
        self.inner
            .machine
            .lock()
            .await
            .set_biometric_enabled(enabled)
            .await
    }

    pub async fn set_auto_lock_policy(&self, policy: AutoLockPolicy) -> Result<()> {
        self.inner
            .machine
            .lock()
            .await
            .set_auto_lock_policy(policy)
            .await
    }

    /// Settings screen values. Re-probes biometric hardware on every call.
    pub async fn settings(&self) -> Result<VaultSettings> {
        self.inner.machine.lock().await.settings().await
    }

    pub async fn enter_digit(&self, digit: char) -> Result<usize> {
        self.inner.machine.lock().await.enter_digit(digit)
    }

    pub async fn delete_digit(&self) -> usize {
        self.inner.machine.lock().await.delete_digit()
    }

    pub async fn clear_entry(&self) {
        self.inner.machine.lock().await.clear_entry()
    }

    pub async fn submit_entry(&self) -> Result<UnlockOutcome> {
        self.inner.machine.lock().await.submit_entry().await
    }
}
