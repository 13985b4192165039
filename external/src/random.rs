//! Randomness for the daily proof-task draw.

/// Draws uniform random index subsets.
pub trait RandomSource: Send + Sync {
    /// `min(amount, len)` distinct indices in `0..len`, uniformly chosen.
    fn sample_indices(&self, len: usize, amount: usize) -> Vec<usize>;
}

/// Thread-local OS-seeded generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn sample_indices(&self, len: usize, amount: usize) -> Vec<usize> {
        let amount = amount.min(len);
        rand::seq::index::sample(&mut rand::rng(), len, amount).into_vec()
    }
}
