//! PIN hashing using Argon2id.
//!
//! Argon2id is a memory-hard password hashing function. A 4-8 digit PIN has
//! very little entropy, so the stored digest is only as strong as the cost
//! parameters make it; the presets below are tuned for phones.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::keys::{PinDigest, Salt, DIGEST_LENGTH};
use vaultgate_common::{Error, Pin, Result};

/// Parameters for Argon2id derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (e.g., 65536 = 64 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Create parameters suitable for interactive use on desktops.
    pub fn interactive() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }

    /// Create parameters suitable for sensitive data.
    ///
    /// Higher security parameters that may take several seconds.
    pub fn sensitive() -> Self {
        Self {
            memory_cost: 262144, // 256 MiB
            time_cost: 4,
            parallelism: 4,
        }
    }

    /// Create moderate parameters for mobile devices.
    pub fn moderate() -> Self {
        Self {
            memory_cost: 32768, // 32 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Minimal parameters for tests. Never use for stored credentials.
    pub fn testing() -> Self {
        Self {
            memory_cost: 8,
            time_cost: 1,
            parallelism: 1,
        }
    }

    /// Look up a preset by name.
    pub fn from_preset(name: &str) -> Result<Self> {
        match name {
            "interactive" => Ok(Self::interactive()),
            "moderate" => Ok(Self::moderate()),
            "sensitive" => Ok(Self::sensitive()),
            "testing" => Ok(Self::testing()),
            other => Err(Error::Config(format!("Unknown KDF preset: {}", other))),
        }
    }

    fn to_argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(DIGEST_LENGTH),
        )
        .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::moderate()
    }
}

/// Derive the digest of a PIN with Argon2id.
///
/// # Postconditions
/// - The digest is deterministic given the same PIN, salt and params
///
/// # Errors
/// - Returns error if Argon2id parameters are invalid
///
/// # Security
/// - The PIN is not stored or logged
pub fn derive_pin_digest(pin: &Pin, salt: &Salt, params: &KdfParams) -> Result<PinDigest> {
    let argon2 = params.to_argon2()?;

    let mut digest = [0u8; DIGEST_LENGTH];
    argon2
        .hash_password_into(pin.as_bytes(), salt.as_bytes(), &mut digest)
        .map_err(|e| Error::Crypto(format!("PIN hashing failed: {}", e)))?;

    Ok(PinDigest::from_bytes(digest))
}

/// Check a PIN against an expected digest in constant time.
pub fn verify_pin_digest(
    pin: &Pin,
    salt: &Salt,
    params: &KdfParams,
    expected: &PinDigest,
) -> Result<bool> {
    let derived = derive_pin_digest(pin, salt, params)?;
    Ok(derived.ct_matches(expected))
}
