//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples protocol logic from system resources
//! (time, randomness, async sleeping). This enables:
//!
//! - Deterministic simulation: a virtual clock and seeded RNG allow perfect
//!   reproduction of any negotiation, including timeout races.
//!
//! - Production runtime: real clock and OS entropy without any code changes
//!   to the protocol logic.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: implementations must not share global state

use std::time::{Duration, Instant};

use transom_proto::{MESSAGE_ID_ENTROPY_LEN, MessageId};

/// Abstract environment providing time, randomness, and async primitives.
///
/// Protocol state machines receive time as explicit event parameters and
/// entropy through this trait, so every exchange is replayable.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// 1. Time monotonicity: `now()` never goes backwards
/// 2. RNG quality: `random_bytes()` uses cryptographically secure entropy in
///    production — message IDs gate which window messages are trusted
/// 3. Minimal panics: methods are infallible except in exceptional
///    circumstances (e.g., OS entropy exhaustion)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: subsequent calls must return times >= previous calls
    ///   within a single execution context.
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be
    /// used by driver code (not protocol logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Security
    ///
    /// Production implementations MUST use OS entropy
    /// (`getrandom::fill()`), never a non-cryptographic RNG. Simulation
    /// implementations use a seeded RNG and MUST log the seed for
    /// reproducibility.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Draws entropy and builds a fresh message correlation ID.
    ///
    /// Every sent message carries its own ID from this method; IDs are never
    /// reused across exchanges.
    fn message_id(&self) -> MessageId {
        let mut entropy = [0u8; MESSAGE_ID_ENTROPY_LEN];
        self.random_bytes(&mut entropy);
        MessageId::from_entropy(&entropy)
    }
}
