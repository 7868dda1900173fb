//! Uniformly distributed initial conditions.

use crate::config::EnsembleConfig;
use anyhow::{bail, Result};
use duffing_core::State;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSeeder {
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub seed: Option<u64>,
}

impl UniformSeeder {
    pub fn from_config(config: &EnsembleConfig) -> Self {
        Self {
            position: config.position_range,
            velocity: config.velocity_range,
            seed: config.seed,
        }
    }

    /// Draws `count` independent (x, v) pairs from [lo, hi) per component and
    /// returns them with the seed that produced them.
    pub fn draw(&self, count: usize) -> Result<(Vec<State<f64>>, u64)> {
        check_range("position", self.position)?;
        check_range("velocity", self.velocity)?;

        let seed = match self.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::rng().random::<u64>();
                info!(seed, "no seed configured, drew one");
                seed
            }
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let states = (0..count)
            .map(|_| {
                let x = rng.random_range(self.position[0]..self.position[1]);
                let v = rng.random_range(self.velocity[0]..self.velocity[1]);
                State::new(x, v)
            })
            .collect();
        Ok((states, seed))
    }
}

/// A sampling interval `[lo, hi)` must be finite, non-empty and have a
/// finite width `hi - lo`.
pub fn check_range(name: &str, range: [f64; 2]) -> Result<()> {
    let [lo, hi] = range;
    if !(lo.is_finite() && hi.is_finite() && lo < hi) {
        bail!("Invalid {name} range {range:?}; expected finite [lo, hi) with lo < hi.");
    }
    if !(hi - lo).is_finite() {
        bail!("Invalid {name} range {range:?}; the width hi - lo overflows.");
    }
    Ok(())
}
