//! Injectable randomness for fallback selection and typing jitter.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// A boxed random source. Production code seeds from the OS; tests pass a
/// fixed seed.
pub type RandomSource = Box<dyn RngCore + Send>;

/// Random source seeded from operating-system entropy.
pub fn os_seeded() -> RandomSource {
    Box::new(StdRng::from_os_rng())
}

/// Deterministic random source for reproducible runs.
pub fn seeded(seed: u64) -> RandomSource {
    Box::new(StdRng::seed_from_u64(seed))
}
