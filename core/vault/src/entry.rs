//! Keypad entry buffer.

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

use vaultgate_common::{Result, ValidationError};

/// Digits typed on the lock screen keypad.
///
/// The buffer is wiped whenever it is cleared, taken or dropped.
pub struct PinEntry {
    digits: Zeroizing<String>,
    max_len: usize,
}

impl PinEntry {
    /// Create an empty buffer accepting up to `max_len` digits.
    pub fn new(max_len: usize) -> Self {
        Self {
            digits: Zeroizing::new(String::with_capacity(max_len)),
            max_len,
        }
    }

    /// Append a digit.
    ///
    /// Digits past `max_len` are ignored.
    ///
    /// # Returns
    /// - `Ok(true)` if the digit was appended
    ///
    /// # Errors
    /// - `NotNumeric` for anything but `0`-`9`
    pub fn push(&mut self, digit: char) -> Result<bool> {
        if !digit.is_ascii_digit() {
            return Err(ValidationError::NotNumeric.into());
        }
        if self.digits.len() >= self.max_len {
            return Ok(false);
        }
        self.digits.push(digit);
        Ok(true)
    }

    /// Remove the last digit.
    pub fn pop(&mut self) -> bool {
        self.digits.pop().is_some()
    }

    /// Wipe the buffer.
    pub fn clear(&mut self) {
        self.digits.zeroize();
    }

    /// Number of digits entered.
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Take the digits out and leave the buffer empty.
    pub fn take(&mut self) -> Zeroizing<String> {
        let taken = Zeroizing::new(self.digits.as_str().to_string());
        self.clear();
        taken
    }
}

impl fmt::Debug for PinEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinEntry([REDACTED; {} digits])", self.digits.len())
    }
}
