//! Common utilities and types shared across VaultGate modules.
//!
//! This module provides the error taxonomy and the validated PIN type used
//! by the credential store, the lock state machine, and the admin CLI.

pub mod error;
pub mod types;

pub use error::{Error, PlatformError, PreconditionError, Result, ValidationError};
pub use types::{Pin, PinRules, PIN_MAX_LEN, PIN_MIN_LEN};
