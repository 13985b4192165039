//! Nullable random: deterministic index sampling.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Mutex;
use terra_external::RandomSource;

enum Mode {
    Seeded(StdRng),
    /// Always pick the first `amount` indices.
    First,
}

/// A deterministic random source for testing.
pub struct NullRandom {
    mode: Mutex<Mode>,
}

impl NullRandom {
    /// Reproducible pseudo-random draws from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            mode: Mutex::new(Mode::Seeded(StdRng::seed_from_u64(seed))),
        }
    }

    /// Always returns `0..amount`.
    pub fn first() -> Self {
        Self {
            mode: Mutex::new(Mode::First),
        }
    }
}

impl RandomSource for NullRandom {
    fn sample_indices(&self, len: usize, amount: usize) -> Vec<usize> {
        let amount = amount.min(len);
        let mut mode = self.mode.lock().unwrap();
        match &mut *mode {
            Mode::Seeded(rng) => rand::seq::index::sample(rng, len, amount).into_vec(),
            Mode::First => (0..amount).collect(),
        }
    }
}
