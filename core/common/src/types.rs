//! Common types used throughout VaultGate.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ValidationError;

/// Smallest PIN length accepted by any configuration.
pub const PIN_MIN_LEN: usize = 4;

/// Default upper bound on PIN length.
pub const PIN_MAX_LEN: usize = 8;

/// Length bounds applied to every PIN before it is stored or compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRules {
    /// Minimum number of digits.
    pub min_len: usize,
    /// Maximum number of digits.
    pub max_len: usize,
}

impl PinRules {
    /// Create rules with explicit bounds.
    ///
    /// # Errors
    /// - `min_len` below [`PIN_MIN_LEN`]
    /// - `max_len` below `min_len`
    pub fn new(min_len: usize, max_len: usize) -> crate::Result<Self> {
        if min_len < PIN_MIN_LEN {
            return Err(crate::Error::Config(format!(
                "PIN minimum length must be at least {}",
                PIN_MIN_LEN
            )));
        }
        if max_len < min_len {
            return Err(crate::Error::Config(
                "PIN maximum length is below the minimum".to_string(),
            ));
        }
        Ok(Self { min_len, max_len })
    }

    /// Check a candidate against the digit and length rules.
    ///
    /// Checks run in the order the user sees them: empty, non-numeric,
    /// too short, too long.
    pub fn check(&self, input: &str) -> std::result::Result<(), ValidationError> {
        if input.is_empty() {
            return Err(ValidationError::Empty);
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::NotNumeric);
        }
        if input.len() < self.min_len {
            return Err(ValidationError::TooShort { min: self.min_len });
        }
        if input.len() > self.max_len {
            return Err(ValidationError::TooLong { max: self.max_len });
        }
        Ok(())
    }
}

impl Default for PinRules {
    fn default() -> Self {
        Self {
            min_len: PIN_MIN_LEN,
            max_len: PIN_MAX_LEN,
        }
    }
}

/// A validated numeric PIN.
///
/// The digits are zeroized on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Pin(String);

impl Pin {
    /// Parse and validate a PIN.
    ///
    /// # Errors
    /// - Any [`ValidationError`] reported by `rules`
    pub fn parse(input: &str, rules: &PinRules) -> std::result::Result<Self, ValidationError> {
        rules.check(input)?;
        Ok(Self(input.to_string()))
    }

    /// Parse `input` and require `confirmation` to match it.
    pub fn parse_confirmed(
        input: &str,
        confirmation: &str,
        rules: &PinRules,
    ) -> std::result::Result<Self, ValidationError> {
        let pin = Self::parse(input, rules)?;
        pin.confirm(confirmation)?;
        Ok(pin)
    }

    /// Require `confirmation` to equal this PIN.
    pub fn confirm(&self, confirmation: &str) -> std::result::Result<(), ValidationError> {
        if self.matches(confirmation) {
            Ok(())
        } else {
            Err(ValidationError::Mismatch)
        }
    }

    /// Constant-time comparison against raw input.
    pub fn matches(&self, other: &str) -> bool {
        self.0.len() == other.len() && bool::from(self.0.as_bytes().ct_eq(other.as_bytes()))
    }

    /// Digits as bytes, for hashing.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Number of digits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a parsed PIN.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for Pin {}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin([REDACTED; {} digits])", self.0.len())
    }
}
