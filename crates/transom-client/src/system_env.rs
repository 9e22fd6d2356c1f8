//! Production Environment implementation using system time and RNG.
//!
//! This module provides `SystemEnv`, the production implementation of the
//! `Environment` trait that uses real system time and cryptographic RNG.

use std::time::Duration;

use transom_core::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// This implementation:
/// - Uses `std::time::Instant::now()` for time
/// - Uses `tokio::time::sleep()` for async sleeping
/// - Uses `getrandom` for cryptographic randomness
///
/// # Security
///
/// The RNG uses `getrandom`, which provides OS-level cryptographic
/// randomness. Message IDs gate which inbound window messages are trusted,
/// so they must be unguessable.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).unwrap_or_else(|e| {
            // NOTE: This should never fail on supported platforms; if it
            // does it's a critical error. Fill with zeros as a fallback
            // (not secure, but prevents panic).
            tracing::error!("getrandom failed: {}", e);
            buffer.fill(0);
        });
    }
}
