//! Cryptographic primitives for VaultGate.
//!
//! This module provides:
//! - PIN hashing using Argon2id
//! - Salt and digest types with automatic zeroization
//! - The serialized `PinHash` record persisted in place of the PIN
//!
//! # Security Guarantees
//! - The raw PIN is never persisted
//! - No PIN or digest material is ever logged
//! - Digest comparison runs in constant time

pub mod hash;
pub mod kdf;
pub mod keys;

pub use hash::{PinHash, PIN_HASH_VERSION};
pub use kdf::{derive_pin_digest, verify_pin_digest, KdfParams};
pub use keys::{PinDigest, Salt, DIGEST_LENGTH, SALT_LENGTH};
