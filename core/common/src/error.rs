//! Common error types for VaultGate.

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for VaultGate operations.
#[derive(Debug, Error)]
pub enum Error {
    /// User input failed a format or confirmation check.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Operation is not allowed in the current credential or lock state.
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// A platform capability (biometric hardware, secure store) is missing.
    #[error("Platform unavailable: {0}")]
    PlatformUnavailable(#[from] PlatformError),

    /// Wrong PIN or rejected biometric challenge.
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// PIN entry is suspended after too many failed attempts.
    #[error("Locked out, retry after {}s", retry_after.as_secs())]
    LockedOut {
        /// Remaining cooldown.
        retry_after: Duration,
    },

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable reason code surfaced to the presentation layer.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Error::Validation(e) => e.reason_code(),
            Error::Precondition(e) => e.reason_code(),
            Error::PlatformUnavailable(PlatformError::HardwareUnavailable) => {
                "HardwareUnavailable"
            }
            Error::PlatformUnavailable(PlatformError::StoreUnavailable(_)) => "StoreUnavailable",
            Error::AuthenticationFailure => "AuthenticationFailure",
            Error::LockedOut { .. } => "LockedOut",
            Error::Storage(_) | Error::Io(_) => "StorageFailure",
            Error::Crypto(_) => "CryptoFailure",
            Error::Serialization(_) => "CorruptRecord",
            Error::Config(_) => "InvalidConfig",
        }
    }
}

/// Field-level input errors. Never change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Nothing was entered.
    #[error("PIN cannot be empty")]
    Empty,
    /// Input contains something other than ASCII digits.
    #[error("PIN must contain only numbers (0-9)")]
    NotNumeric,
    /// Input shorter than the configured minimum.
    #[error("PIN must be at least {min} digits")]
    TooShort {
        /// Minimum length.
        min: usize,
    },
    /// Input longer than the configured maximum.
    #[error("PIN must be at most {max} digits")]
    TooLong {
        /// Maximum length.
        max: usize,
    },
    /// PIN and confirmation differ.
    #[error("PINs do not match")]
    Mismatch,
}

impl ValidationError {
    fn reason_code(&self) -> &'static str {
        match self {
            ValidationError::Empty => "Empty",
            ValidationError::NotNumeric => "NotNumeric",
            ValidationError::TooShort { .. } => "TooShort",
            ValidationError::TooLong { .. } => "TooLong",
            ValidationError::Mismatch => "Mismatch",
        }
    }
}

/// The requested operation needs a different credential or lock state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// Biometric unlock requires a PIN.
    #[error("Please set a PIN first")]
    NoPinSet,
    /// Biometric unlock was requested but is switched off.
    #[error("Biometric unlock is not enabled")]
    BiometricDisabled,
    /// Setup was requested while a PIN exists.
    #[error("A PIN is already set")]
    PinAlreadySet,
    /// Current PIN check failed during a change.
    #[error("Current PIN is incorrect")]
    IncorrectCurrentPin,
    /// Commit attempted before the current PIN was verified.
    #[error("Current PIN has not been verified")]
    CurrentPinNotVerified,
    /// Event not accepted in the current lock state.
    #[error("Not allowed while {0}")]
    InvalidState(String),
}

impl PreconditionError {
    fn reason_code(&self) -> &'static str {
        match self {
            PreconditionError::NoPinSet => "NoPinSet",
            PreconditionError::BiometricDisabled => "BiometricDisabled",
            PreconditionError::PinAlreadySet => "PinAlreadySet",
            PreconditionError::IncorrectCurrentPin => "IncorrectCurrentPin",
            PreconditionError::CurrentPinNotVerified => "CurrentPinNotVerified",
            PreconditionError::InvalidState(_) => "InvalidState",
        }
    }
}

/// Missing platform capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// No biometric hardware, or nothing enrolled.
    #[error("Biometric authentication not available on this device")]
    HardwareUnavailable,
    /// The credential store backend cannot be reached.
    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
