//! Vault lock subsystem for VaultGate.
//!
//! This module provides:
//! - PIN setup, verification, change and removal
//! - Optional biometric unlock with a single automatic attempt
//! - Failed-attempt counting with an advisory or cooldown lockout
//! - An auto-lock timer and lock-on-leave lifecycle handling
//!
//! # Architecture
//! [`VaultGate`] is the only entry point for the presentation layer. It
//! serializes access to one [`LockStateMachine`], which in turn reads and
//! writes through a [`CredentialStore`] on top of any
//! [`vaultgate_storage::SecretStore`].

pub mod biometric;
pub mod config;
pub mod credentials;
pub mod entry;
pub mod events;
pub mod gate;
pub mod lifecycle;
pub mod machine;
pub mod policy;
pub mod scheduler;
pub mod session;

pub use biometric::{BiometricGate, BiometricService, ChallengeOutcome, NoBiometrics};
pub use config::{GateConfig, LockoutMode};
pub use credentials::{CredentialSnapshot, CredentialStore, PinRecord};
pub use entry::PinEntry;
pub use events::{EventBus, LockEvent, LockReason};
pub use gate::VaultGate;
pub use lifecycle::LifecycleEvent;
pub use machine::{lockout_message, LockState, LockStateMachine, UnlockOutcome, VaultSettings};
pub use policy::AutoLockPolicy;
pub use scheduler::{AutoLockScheduler, AutoLockTarget};
pub use session::{SessionHandle, UnlockMethod, UnlockSession};
