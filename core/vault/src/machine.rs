//! Lock state machine.
//!
//! `LockStateMachine` owns the lock state, the attempt counter, the keypad
//! buffer and the auto-lock scheduler. It is not synchronized; callers
//! serialize access through [`crate::VaultGate`].

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::biometric::{BiometricGate, ChallengeOutcome};
use crate::config::GateConfig;
use crate::credentials::{CredentialSnapshot, CredentialStore};
use crate::entry::PinEntry;
use crate::events::{EventBus, LockEvent, LockReason};
use crate::lifecycle::LifecycleEvent;
use crate::policy::AutoLockPolicy;
use crate::scheduler::{AutoLockScheduler, AutoLockTarget};
use crate::session::{UnlockMethod, UnlockSession};
use vaultgate_common::{
    Error, Pin, PinRules, PlatformError, PreconditionError, Result, ValidationError,
};

/// Current lock state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// No PIN exists. The vault is open and routes to PIN setup.
    Uninitialized,
    /// Content hidden.
    Locked {
        /// Wrong PINs since the last unlock or lockout.
        failed_attempts: u32,
    },
    /// Content visible.
    Unlocked,
    /// Creating the first PIN.
    SettingPin {
        /// First entry, awaiting confirmation.
        draft: Option<Pin>,
    },
    /// Changing the PIN from an unlocked vault.
    ChangingPin {
        /// Current PIN already checked.
        verified_current: bool,
    },
}

impl LockState {
    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            LockState::Uninitialized => "uninitialized",
            LockState::Locked { .. } => "locked",
            LockState::Unlocked => "unlocked",
            LockState::SettingPin { .. } => "setting PIN",
            LockState::ChangingPin { .. } => "changing PIN",
        }
    }

    /// Whether vault content is hidden.
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. })
    }

    /// Whether an unlock session is live.
    pub fn is_unlocked(&self) -> bool {
        matches!(self, LockState::Unlocked | LockState::ChangingPin { .. })
    }
}

/// Result of a PIN or biometric unlock attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// The vault is open.
    Unlocked,
    /// Wrong PIN, counted.
    Rejected {
        /// Attempts left before the lockout response.
        attempts_remaining: u32,
    },
    /// Threshold reached; the counter is back at zero.
    LockedOut {
        /// Text for the lock screen.
        message: String,
        /// Cooldown before the next attempt is accepted, if any.
        retry_after: Option<Duration>,
    },
    /// Biometric challenge failed or was unavailable; fall back to the PIN.
    BiometricDeclined(ChallengeOutcome),
}

/// Values shown on the vault settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultSettings {
    pub has_pin: bool,
    pub biometric_available: bool,
    pub biometric_enabled: bool,
    pub auto_lock_policy: AutoLockPolicy,
}

/// Message shown when the failed-attempt threshold is reached.
pub fn lockout_message(retry_after: Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(
            "Too many failed attempts. Try again in {} seconds.",
            d.as_secs()
        ),
        None => "Too many failed attempts. Please try again.".to_string(),
    }
}

/// Vault lock state machine.
pub struct LockStateMachine {
    state: LockState,
    credentials: CredentialStore,
    biometric: BiometricGate,
    scheduler: AutoLockScheduler,
    entry: PinEntry,
    events: EventBus,
    config: GateConfig,
    rules: PinRules,
    session: Option<UnlockSession>,
    cooldown_until: Option<Instant>,
    auto_biometric_attempted: bool,
}

impl LockStateMachine {
    /// Create a machine in `Uninitialized`. Call [`Self::load`] before use.
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn new(
        credentials: CredentialStore,
        biometric: BiometricGate,
        config: GateConfig,
        events: EventBus,
    ) -> Result<Self> {
        config.validate()?;
        let rules = config.pin_rules()?;
        Ok(Self {
            state: LockState::Uninitialized,
            credentials,
            biometric,
            scheduler: AutoLockScheduler::new(AutoLockPolicy::default()),
            entry: PinEntry::new(rules.max_len),
            events,
            config,
            rules,
            session: None,
            cooldown_until: None,
            auto_biometric_attempted: false,
        })
    }

    /// Derive the initial state from the stored credentials.
    ///
    /// # Postconditions
    /// - `Uninitialized` without a PIN, `Locked(0)` with one
    pub async fn load(&mut self) -> Result<&LockState> {
        let snapshot = self.credentials.snapshot().await?;
        self.scheduler.set_policy(snapshot.auto_lock_policy);
        self.state = if snapshot.has_pin {
            LockState::Locked { failed_attempts: 0 }
        } else {
            LockState::Uninitialized
        };
        info!("Vault gate mounted in state {}", self.state.name());
        Ok(&self.state)
    }

    /// Route timer fires to `target`.
    pub fn attach_scheduler(&mut self, target: std::sync::Weak<dyn AutoLockTarget>) {
        self.scheduler.attach(target);
    }

    /// Run the automatic biometric challenge.
    ///
    /// Only runs once per machine, only from `Locked`, and only when
    /// biometric unlock is enabled and the hardware is present.
    ///
    /// # Returns
    /// - `None` if no challenge was attempted
    pub async fn auto_biometric(&mut self) -> Result<Option<UnlockOutcome>> {
        if self.auto_biometric_attempted || !self.state.is_locked() {
            return Ok(None);
        }
        self.auto_biometric_attempted = true;

        if !self.credentials.biometric_enabled().await? || !self.biometric.is_available().await {
            return Ok(None);
        }
        debug!("Attempting automatic biometric unlock");
        self.unlock_with_biometric().await.map(Some)
    }

    /// Current state.
    pub fn state(&self) -> &LockState {
        &self.state
    }

    /// Wrong PINs counted so far.
    pub fn failed_attempts(&self) -> u32 {
        match self.state {
            LockState::Locked { failed_attempts } => failed_attempts,
            _ => 0,
        }
    }

    /// Live unlock session.
    pub fn session(&self) -> Option<&UnlockSession> {
        self.session.as_ref()
    }

    /// Auto-lock scheduler.
    pub fn scheduler(&self) -> &AutoLockScheduler {
        &self.scheduler
    }

    /// Credential access.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn invalid_state(&self) -> Error {
        PreconditionError::InvalidState(self.state.name().to_string()).into()
    }

    /// Create the first PIN and unlock.
    ///
    /// # Preconditions
    /// - State is `Uninitialized` or `SettingPin`
    ///
    /// # Errors
    /// - `Validation` for bad format or mismatch (nothing written)
    /// - `Precondition(PinAlreadySet)` if a PIN exists
    pub async fn setup_pin(&mut self, pin: &str, confirmation: &str) -> Result<()> {
        if !matches!(
            self.state,
            LockState::Uninitialized | LockState::SettingPin { .. }
        ) {
            return Err(self.invalid_state());
        }
        let pin = Pin::parse_confirmed(pin, confirmation, &self.rules)?;
        self.create_pin(&pin).await
    }

    /// Start the two-step setup flow.
    pub fn begin_pin_setup(&mut self) -> Result<()> {
        match self.state {
            LockState::Uninitialized => {
                self.state = LockState::SettingPin { draft: None };
                Ok(())
            }
            LockState::SettingPin { .. } => Ok(()),
            _ => Err(self.invalid_state()),
        }
    }

    /// Validate the first entry of a new PIN and hold it for confirmation.
    pub fn stage_pin_draft(&mut self, pin: &str) -> Result<()> {
        if !matches!(self.state, LockState::SettingPin { .. }) {
            return Err(self.invalid_state());
        }
        let draft = Pin::parse(pin, &self.rules)?;
        self.state = LockState::SettingPin { draft: Some(draft) };
        Ok(())
    }

    /// Confirm the staged draft and create the PIN.
    ///
    /// A mismatch keeps the draft so the user can retry the confirmation.
    pub async fn confirm_pin_draft(&mut self, confirmation: &str) -> Result<()> {
        let draft = match &self.state {
            LockState::SettingPin { draft: Some(draft) } => draft.clone(),
            _ => return Err(self.invalid_state()),
        };
        draft.confirm(confirmation)?;
        self.create_pin(&draft).await
    }

    async fn create_pin(&mut self, pin: &Pin) -> Result<()> {
        if self.credentials.has_pin().await? {
            return Err(PreconditionError::PinAlreadySet.into());
        }
        self.credentials.store_pin(pin).await?;
        self.events.emit(LockEvent::PinSet);
        self.enter_unlocked(UnlockMethod::Setup).await;
        Ok(())
    }

    /// Check a PIN entered on the lock screen.
    ///
    /// Wrong or malformed candidates count as failed attempts. Storage errors
    /// leave the counter alone.
    ///
    /// # Errors
    /// - `Validation(Empty)` for an empty candidate (not counted)
    /// - `LockedOut` while a cooldown is running (not counted)
    pub async fn verify_pin(&mut self, candidate: &str) -> Result<UnlockOutcome> {
        let LockState::Locked { failed_attempts } = self.state else {
            return Err(self.invalid_state());
        };
        if candidate.is_empty() {
            return Err(ValidationError::Empty.into());
        }
        if let Some(until) = self.cooldown_until {
            let now = Instant::now();
            if now < until {
                return Err(Error::LockedOut {
                    retry_after: until - now,
                });
            }
            self.cooldown_until = None;
        }

        if self.credentials.verify_pin(candidate).await? {
            self.enter_unlocked(UnlockMethod::Pin).await;
            return Ok(UnlockOutcome::Unlocked);
        }
        Ok(self.register_failure(failed_attempts))
    }

    fn register_failure(&mut self, failed_attempts: u32) -> UnlockOutcome {
        let attempts = failed_attempts.saturating_add(1);
        let max = self.config.max_failed_attempts;

        if attempts < max {
            self.state = LockState::Locked {
                failed_attempts: attempts,
            };
            let attempts_remaining = max - attempts;
            info!("Wrong PIN, {} attempts remaining", attempts_remaining);
            self.events.emit(LockEvent::AttemptRejected { attempts_remaining });
            return UnlockOutcome::Rejected { attempts_remaining };
        }

        let retry_after = self.config.lockout.cooldown();
        self.cooldown_until = retry_after.map(|d| Instant::now() + d);
        self.state = LockState::Locked { failed_attempts: 0 };
        self.entry.clear();

        let message = lockout_message(retry_after);
        warn!("PIN lockout after {} failed attempts", attempts);
        self.events.emit(LockEvent::LockedOut {
            message: message.clone(),
        });
        UnlockOutcome::LockedOut {
            message,
            retry_after,
        }
    }

    /// Explicitly run one biometric challenge from `Locked`.
    ///
    /// Failure leaves the state and counter as they were.
    ///
    /// # Errors
    /// - `Precondition(BiometricDisabled)` if biometric unlock is off
    pub async fn unlock_with_biometric(&mut self) -> Result<UnlockOutcome> {
        if !self.state.is_locked() {
            return Err(self.invalid_state());
        }
        if !self.credentials.biometric_enabled().await? {
            return Err(PreconditionError::BiometricDisabled.into());
        }

        let prompt = self.config.biometric_prompt.clone();
        match self.biometric.challenge(&prompt).await {
            ChallengeOutcome::Success => {
                self.enter_unlocked(UnlockMethod::Biometric).await;
                Ok(UnlockOutcome::Unlocked)
            }
            declined => {
                debug!("Biometric unlock declined: {:?}", declined);
                Ok(UnlockOutcome::BiometricDeclined(declined))
            }
        }
    }

    async fn enter_unlocked(&mut self, method: UnlockMethod) {
        let policy = match self.credentials.auto_lock_policy().await {
            Ok(policy) => policy,
            Err(e) => {
                warn!("Could not read auto-lock policy, keeping current: {}", e);
                self.scheduler.policy()
            }
        };

        self.state = LockState::Unlocked;
        self.cooldown_until = None;
        self.entry.clear();
        let session = UnlockSession::start(method);
        let handle = session.handle().clone();
        self.session = Some(session);
        self.scheduler.reset(policy);

        info!("Vault unlocked via {:?}", method);
        self.events.emit(LockEvent::Unlocked {
            method,
            session: handle,
        });
    }

    /// Lock the vault.
    ///
    /// # Returns
    /// - `true` if the state changed; locking a vault that is not unlocked
    ///   is a no-op
    pub fn lock(&mut self, reason: LockReason) -> bool {
        if !self.state.is_unlocked() {
            return false;
        }
        self.scheduler.cancel_on_lock();
        self.entry.clear();
        self.session = None;
        self.state = LockState::Locked { failed_attempts: 0 };

        info!("Vault locked ({:?})", reason);
        self.events.emit(LockEvent::Locked { reason });
        true
    }

    /// Handle an app lifecycle or focus signal.
    ///
    /// The policy is re-read from the store first so a change made on
    /// another screen applies.
    pub async fn on_lifecycle(&mut self, event: LifecycleEvent) -> bool {
        if !self.state.is_unlocked() {
            return false;
        }
        match self.credentials.auto_lock_policy().await {
            Ok(policy) => self.scheduler.set_policy(policy),
            Err(e) => warn!("Could not read auto-lock policy: {}", e),
        }
        if !self.scheduler.should_lock_on(event) {
            return false;
        }
        let reason = match event {
            LifecycleEvent::FocusLost => LockReason::FocusLost,
            _ => LockReason::Background,
        };
        self.lock(reason)
    }

    /// Handle a timer fire.
    pub fn on_timer(&mut self, generation: u64) -> bool {
        if !self.scheduler.fired(generation) {
            return false;
        }
        self.lock(LockReason::Timeout)
    }

    /// Restart the inactivity timer. No-op unless unlocked.
    pub fn record_activity(&mut self) {
        if self.state.is_unlocked() {
            self.scheduler.reset(self.scheduler.policy());
        }
    }

    /// Delete the PIN from any state.
    ///
    /// # Postconditions
    /// - Biometric unlock is off and the state is `Uninitialized`
    pub async fn remove_pin(&mut self) -> Result<()> {
        self.credentials.remove_pin().await?;

        self.scheduler.cancel_on_lock();
        self.entry.clear();
        self.session = None;
        self.cooldown_until = None;
        self.state = LockState::Uninitialized;

        self.events.emit(LockEvent::PinRemoved);
        Ok(())
    }

    /// Change the PIN in one call.
    ///
    /// # Errors
    /// - `Precondition(IncorrectCurrentPin)` (not counted as a lock-screen
    ///   attempt)
    /// - `Validation` for the new PIN
    pub async fn change_pin(&mut self, current: &str, new: &str, confirmation: &str) -> Result<()> {
        if !self.state.is_unlocked() {
            return Err(self.invalid_state());
        }
        if !self.credentials.verify_pin(current).await? {
            return Err(PreconditionError::IncorrectCurrentPin.into());
        }
        let pin = Pin::parse_confirmed(new, confirmation, &self.rules)?;
        self.replace_pin(&pin).await
    }

    /// Start the two-step change flow.
    pub fn begin_pin_change(&mut self) -> Result<()> {
        match self.state {
            LockState::Unlocked => {
                self.state = LockState::ChangingPin {
                    verified_current: false,
                };
                Ok(())
            }
            LockState::ChangingPin { .. } => Ok(()),
            _ => Err(self.invalid_state()),
        }
    }

    /// Check the current PIN inside the change flow.
    pub async fn verify_current_pin(&mut self, current: &str) -> Result<()> {
        if !matches!(self.state, LockState::ChangingPin { .. }) {
            return Err(self.invalid_state());
        }
        if !self.credentials.verify_pin(current).await? {
            return Err(PreconditionError::IncorrectCurrentPin.into());
        }
        self.state = LockState::ChangingPin {
            verified_current: true,
        };
        Ok(())
    }

    /// Store the new PIN after the current one was verified.
    pub async fn commit_pin_change(&mut self, new: &str, confirmation: &str) -> Result<()> {
        match self.state {
            LockState::ChangingPin {
                verified_current: true,
            } => {}
            LockState::ChangingPin { .. } => {
                return Err(PreconditionError::CurrentPinNotVerified.into())
            }
            _ => return Err(self.invalid_state()),
        }
        let pin = Pin::parse_confirmed(new, confirmation, &self.rules)?;
        self.replace_pin(&pin).await
    }

    async fn replace_pin(&mut self, pin: &Pin) -> Result<()> {
        self.credentials.store_pin(pin).await?;
        self.state = LockState::Unlocked;
        self.events.emit(LockEvent::PinChanged);
        Ok(())
    }

    /// Leave a setup or change flow without writing anything.
    pub fn cancel_pin_management(&mut self) {
        match self.state {
            LockState::SettingPin { .. } => self.state = LockState::Uninitialized,
            LockState::ChangingPin { .. } => self.state = LockState::Unlocked,
            _ => {}
        }
    }

    /// Turn biometric unlock on or off.
    ///
    /// Enabling checks, in order: hardware, PIN, lock state, then a
    /// confirming challenge. Disabling always succeeds.
    ///
    /// # Errors
    /// - `PlatformUnavailable(HardwareUnavailable)`
    /// - `Precondition(NoPinSet)`
    /// - `AuthenticationFailure` if the confirming challenge fails
    pub async fn set_biometric_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            if !self.biometric.refresh_availability().await {
                return Err(PlatformError::HardwareUnavailable.into());
            }
            if !self.credentials.has_pin().await? {
                return Err(PreconditionError::NoPinSet.into());
            }
            if self.state.is_locked() {
                return Err(self.invalid_state());
            }
            let prompt = self.config.biometric_enable_prompt.clone();
            match self.biometric.challenge(&prompt).await {
                ChallengeOutcome::Success => {}
                ChallengeOutcome::Failure => return Err(Error::AuthenticationFailure),
                ChallengeOutcome::Unavailable => {
                    return Err(PlatformError::HardwareUnavailable.into())
                }
            }
        }

        self.credentials.set_biometric_enabled(enabled).await?;
        info!("Biometric unlock {}", if enabled { "enabled" } else { "disabled" });
        self.events.emit(LockEvent::BiometricChanged { enabled });
        Ok(())
    }

    /// Persist a new auto-lock policy and re-arm the timer if unlocked.
    ///
    /// An unsupported minute value is refused before the store or the
    /// timer is touched.
    pub async fn set_auto_lock_policy(&mut self, policy: AutoLockPolicy) -> Result<()> {
        self.credentials.set_auto_lock_policy(policy).await?;
        if self.state.is_unlocked() {
            self.scheduler.reset(policy);
        } else {
            self.scheduler.set_policy(policy);
        }
        self.events.emit(LockEvent::PolicyChanged { policy });
        Ok(())
    }

    /// Settings screen values. Re-probes the biometric hardware.
    pub async fn settings(&self) -> Result<VaultSettings> {
        let biometric_available = self.biometric.refresh_availability().await;
        let CredentialSnapshot {
            has_pin,
            biometric_enabled,
            auto_lock_policy,
        } = self.credentials.snapshot().await?;
        Ok(VaultSettings {
            has_pin,
            biometric_available,
            biometric_enabled: biometric_enabled && biometric_available,
            auto_lock_policy,
        })
    }

    /// Append a keypad digit.
    ///
    /// # Returns
    /// - Digits now in the buffer
    pub fn enter_digit(&mut self, digit: char) -> Result<usize> {
        if !self.state.is_locked() {
            return Err(self.invalid_state());
        }
        self.entry.push(digit)?;
        Ok(self.entry.len())
    }

    /// Remove the last keypad digit.
    pub fn delete_digit(&mut self) -> usize {
        self.entry.pop();
        self.entry.len()
    }

    /// Wipe the keypad buffer.
    pub fn clear_entry(&mut self) {
        self.entry.clear();
    }

    /// Digits in the keypad buffer.
    pub fn entry_len(&self) -> usize {
        self.entry.len()
    }

    /// Verify the keypad buffer. The buffer is cleared either way.
    pub async fn submit_entry(&mut self) -> Result<UnlockOutcome> {
        let digits = self.entry.take();
        self.verify_pin(&digits).await
    }
}
