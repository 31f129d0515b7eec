use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Shared randomness for every approximation the pipeline makes (sampled
/// form strings, news adjectives, engagement counts). Seed it to make those
/// outputs reproducible.
pub struct Randomness {
    rng: Mutex<StdRng>,
}

impl Randomness {
    pub fn from_entropy() -> Self {
        Randomness {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Randomness {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A poisoned lock still holds a usable generator
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut rng)
    }

    /// Uniform in `[0, 1)`.
    pub fn unit(&self) -> f64 {
        self.with(|rng| rng.gen::<f64>())
    }

    /// Uniform index in `0..len`; `len` must be non-zero.
    pub fn index(&self, len: usize) -> usize {
        self.with(|rng| rng.gen_range(0..len))
    }

    /// Uniform in `lo..=hi`.
    pub fn between(&self, lo: u32, hi: u32) -> u32 {
        self.with(|rng| rng.gen_range(lo..=hi))
    }
}

impl Default for Randomness {
    fn default() -> Self {
        Self::from_entropy()
    }
}
