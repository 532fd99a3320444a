//! Biometric unlock.
//!
//! The platform side is a [`BiometricService`]. [`BiometricGate`] adds the
//! cached hardware probe and maps every platform failure to
//! [`ChallengeOutcome::Unavailable`] so callers only deal with three
//! outcomes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use vaultgate_common::Result;

/// Platform biometric API.
#[async_trait]
pub trait BiometricService: Send + Sync {
    /// Whether biometric hardware is present and enrolled.
    async fn has_hardware(&self) -> Result<bool>;

    /// Show the platform prompt with `reason`.
    ///
    /// # Returns
    /// - `Ok(true)` if the user authenticated
    /// - `Ok(false)` if the user failed or cancelled
    async fn authenticate(&self, reason: &str) -> Result<bool>;
}

/// Service for devices without biometrics, e.g. the admin CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricService for NoBiometrics {
    async fn has_hardware(&self) -> Result<bool> {
        Ok(false)
    }

    async fn authenticate(&self, _reason: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Result of one challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Success,
    Failure,
    Unavailable,
}

const UNKNOWN: u8 = 0;
const ABSENT: u8 = 1;
const PRESENT: u8 = 2;

/// Cached access to a [`BiometricService`].
pub struct BiometricGate {
    service: Arc<dyn BiometricService>,
    availability: AtomicU8,
}

impl BiometricGate {
    /// Wrap a platform service.
    pub fn new(service: Arc<dyn BiometricService>) -> Self {
        Self {
            service,
            availability: AtomicU8::new(UNKNOWN),
        }
    }

    /// Whether hardware is present, probing only on first use.
    pub async fn is_available(&self) -> bool {
        match self.availability.load(Ordering::Acquire) {
            PRESENT => true,
            ABSENT => false,
            _ => self.refresh_availability().await,
        }
    }

    /// Probe the hardware again and cache the answer.
    pub async fn refresh_availability(&self) -> bool {
        let available = match self.service.has_hardware().await {
            Ok(available) => available,
            Err(e) => {
                warn!("Biometric hardware probe failed: {}", e);
                false
            }
        };
        let cached = if available { PRESENT } else { ABSENT };
        self.availability.store(cached, Ordering::Release);
        debug!("Biometric hardware available: {}", available);
        available
    }

    /// Run a single challenge. Never retried here.
    pub async fn challenge(&self, reason: &str) -> ChallengeOutcome {
        if !self.is_available().await {
            return ChallengeOutcome::Unavailable;
        }
        match self.service.authenticate(reason).await {
            Ok(true) => ChallengeOutcome::Success,
            Ok(false) => ChallengeOutcome::Failure,
            Err(e) => {
                warn!("Biometric challenge failed: {}", e);
                ChallengeOutcome::Unavailable
            }
        }
    }
}
