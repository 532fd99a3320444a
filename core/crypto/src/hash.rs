//! Stored form of a PIN.
//!
//! Only the salt, the Argon2id digest and the parameters used to produce it
//! are persisted. Binary fields are base64 encoded so the record fits in a
//! string-valued key-value store.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::kdf::{derive_pin_digest, verify_pin_digest, KdfParams};
use crate::keys::{PinDigest, Salt, DIGEST_LENGTH, SALT_LENGTH};
use vaultgate_common::{Error, Pin, Result};

/// Hash format version.
pub const PIN_HASH_VERSION: u32 = 1;

/// Salted Argon2id hash of a PIN.
#[derive(Clone, Serialize, Deserialize)]
pub struct PinHash {
    /// Format version.
    pub version: u32,
    /// Per-PIN random salt.
    #[serde(with = "b64_salt")]
    pub salt: Salt,
    /// Argon2id output.
    #[serde(with = "b64_digest")]
    pub digest: PinDigest,
    /// Parameters used for `digest`.
    pub kdf_params: KdfParams,
}

impl PinHash {
    /// Hash a PIN with a fresh salt.
    pub fn new(pin: &Pin, kdf_params: KdfParams) -> Result<Self> {
        let salt = Salt::generate();
        let digest = derive_pin_digest(pin, &salt, &kdf_params)?;
        Ok(Self {
            version: PIN_HASH_VERSION,
            salt,
            digest,
            kdf_params,
        })
    }

    /// Check a candidate PIN against this hash.
    ///
    /// Uses the stored parameters, so records written with older presets
    /// keep verifying after the configured preset changes.
    pub fn verify(&self, candidate: &Pin) -> Result<bool> {
        if self.version != PIN_HASH_VERSION {
            return Err(Error::Crypto(format!(
                "Unsupported PIN hash version: {}",
                self.version
            )));
        }
        verify_pin_digest(candidate, &self.salt, &self.kdf_params, &self.digest)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl fmt::Debug for PinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinHash")
            .field("version", &self.version)
            .field("kdf_params", &self.kdf_params)
            .finish_non_exhaustive()
    }
}

fn decode_fixed<const N: usize, E: serde::de::Error>(encoded: &str) -> std::result::Result<[u8; N], E> {
    let bytes = BASE64.decode(encoded).map_err(E::custom)?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| E::custom(format!("expected {} bytes, got {}", N, v.len())))
}

mod b64_salt {
    use super::*;

    pub fn serialize<S: Serializer>(salt: &Salt, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&BASE64.encode(salt.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Salt, D::Error> {
        let encoded = String::deserialize(d)?;
        decode_fixed::<SALT_LENGTH, D::Error>(&encoded).map(Salt::from_bytes)
    }
}

mod b64_digest {
    use super::*;

    pub fn serialize<S: Serializer>(digest: &PinDigest, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&BASE64.encode(digest.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<PinDigest, D::Error> {
        let encoded = String::deserialize(d)?;
        decode_fixed::<DIGEST_LENGTH, D::Error>(&encoded).map(PinDigest::from_bytes)
    }
}
