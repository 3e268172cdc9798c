//! Randomness capability handed to every resolver.
//!
//! Resolvers are generic over [`rand::Rng`] so production rounds can draw from an
//! OS-seeded ChaCha generator while tests pin outcomes with a fixed seed.

use rand::rngs::OsRng;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

/// Uniform draws used by the game resolvers
pub trait RandomSource {
    /// Integer in `[0, n)`. `n` must be non-zero.
    fn uniform_int(&mut self, n: usize) -> usize;

    /// Float in `[0, 1)`
    fn uniform_float(&mut self) -> f64;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn uniform_int(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }

    fn uniform_float(&mut self) -> f64 {
        self.r#gen::<f64>()
    }
}

/// Generator for live rounds: ChaCha12 seeded from the operating system.
pub fn secure() -> StdRng {
    StdRng::from_rng(OsRng).unwrap_or_else(|_| StdRng::from_entropy())
}

/// Deterministic generator for tests and offline simulation
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Generator from a full 32-byte seed, used to rebuild a round's deck
pub fn from_seed(seed: [u8; 32]) -> StdRng {
    StdRng::from_seed(seed)
}
