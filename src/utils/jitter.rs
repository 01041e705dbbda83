//! Substitutable jitter source
//!
//! Backoff and cooldown windows are jittered to avoid synchronized retries.
//! The randomness sits behind a trait so clock-sensitive tests can pin delays
//! exactly.

use rand::Rng;

/// Source of jitter fractions for backoff calculations
pub trait JitterSource: Send + Sync {
    /// Return a fraction in `[0, 1)`
    fn fraction(&self) -> f64;
}

/// Default jitter source backed by the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn fraction(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// Zero-jitter source for deterministic tests
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn fraction(&self) -> f64 {
        0.0
    }
}
