//! Random number generator abstraction for determinism.
//!
//! In production, this wraps a real RNG. In tests, a seeded or scripted
//! implementation is injected so room codes and tie-breaks are repeatable.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;

    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;

    /// Pick a uniformly distributed index into a collection of `len` items.
    ///
    /// Returns 0 for empty or single-element collections without drawing.
    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        let max = u32::try_from(len - 1).unwrap_or(u32::MAX);
        let index = self.next_u32_range(0, max) as usize;
        index.min(len - 1)
    }
}

/// Production RNG seeded from the operating system.
#[derive(Debug)]
pub struct SystemRng(StdRng);

impl SystemRng {
    /// Creates an RNG seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Creates an RNG from a fixed seed, for reproducible simulations.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl DeterministicRng for SystemRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        self.0.random_range(min..=max)
    }

    fn next_f64(&mut self) -> f64 {
        self.0.random()
    }
}
