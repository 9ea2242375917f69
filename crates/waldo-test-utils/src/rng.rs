//! Deterministic RNG utilities for reproducible tests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use waldo_core::types::Command;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Generate a deterministic `Vec<f32>` in `[-1, 1)` of length `dim`.
#[must_use]
pub fn deterministic_vec(dim: usize, seed: u64) -> Vec<f32> {
    use rand::Rng;
    let mut rng = seeded_rng(seed);
    (0..dim).map(|_| rng.r#gen::<f32>().mul_add(2.0, -1.0)).collect()
}

/// Build a deterministic single-argument [`Command`].
#[must_use]
pub fn deterministic_command(arg: &str, dim: usize, seed: u64) -> Command {
    Command::new().with_arg(arg, deterministic_vec(dim, seed))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
