//! Per-run execution context
//!
//! Holds the state every stage would otherwise reach for globally: the
//! random number generator used for weight initialization and noise
//! sampling, and the device flag that decides whether batch evolution runs
//! on the rayon pool.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::config::ExperimentConfig;

/// Explicit context created once per run and passed to every stage.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    seed: u64,
    rng: StdRng,
    parallel: bool,
}

impl ExecutionContext {
    /// Creates a context from a fixed seed.
    pub fn seeded(seed: u64, parallel: bool) -> Self {
        ExecutionContext {
            seed,
            rng: StdRng::seed_from_u64(seed),
            parallel,
        }
    }

    /// Creates a context from the configuration, drawing a fresh seed when none is set.
    pub fn from_config(config: &ExperimentConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
        Self::seeded(seed, config.parallel)
    }

    /// The seed this context was created from; reusing it reproduces the run.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether batch samples are evolved in parallel.
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// The run's random number generator.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
