//! Salt and digest types with secure memory handling.
//!
//! Digests zeroize their memory on drop so a verified PIN hash does not
//! linger after comparison.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a PIN digest in bytes (256-bit).
pub const DIGEST_LENGTH: usize = 32;

/// Length of a salt in bytes.
pub const SALT_LENGTH: usize = 32;

/// Argon2id output for a PIN.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PinDigest {
    digest: [u8; DIGEST_LENGTH],
}

impl PinDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(digest: [u8; DIGEST_LENGTH]) -> Self {
        Self { digest }
    }

    /// Get the digest bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.digest
    }

    /// Constant-time equality.
    pub fn ct_matches(&self, other: &PinDigest) -> bool {
        bool::from(self.digest.ct_eq(&other.digest))
    }
}

impl fmt::Debug for PinDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinDigest([REDACTED])")
    }
}

/// Salt for PIN hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(pub [u8; SALT_LENGTH]);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Self {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_generate() {
        let salt1 = Salt::generate();
        let salt2 = Salt::generate();

        // Random salts should be different
        assert_ne!(salt1.as_bytes(), salt2.as_bytes());
    }

    #[test]
    fn test_digest_ct_matches() {
        let a = PinDigest::from_bytes([7u8; DIGEST_LENGTH]);
        let b = PinDigest::from_bytes([7u8; DIGEST_LENGTH]);
        let mut other = [7u8; DIGEST_LENGTH];
        other[DIGEST_LENGTH - 1] = 8;
        let c = PinDigest::from_bytes(other);

        assert!(a.ct_matches(&b));
        assert!(!a.ct_matches(&c));
    }

    #[test]
    fn test_digest_debug_redacted() {
        let digest = PinDigest::from_bytes([1u8; DIGEST_LENGTH]);
        assert_eq!(format!("{:?}", digest), "PinDigest([REDACTED])");
    }
}
