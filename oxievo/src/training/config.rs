use serde::{Deserialize, Serialize};

/// Configuration data for a training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of worker threads. `None` uses the
    /// available parallelism of the machine.
    pub thread_count: Option<usize>,
    /// Checks population invariants after every
    /// generation, and rejects duplicate insertions.
    pub validation_mode: bool,
    /// Retries offspring whose operator or scoring
    /// failed instead of aborting the generation.
    /// Invariant violations are never ignored.
    pub ignore_exceptions: bool,
    /// Number of contestants per selection tournament.
    pub tournament_rounds: usize,
    /// Number of draws attempted to find a second
    /// parent distinct from the first.
    pub max_parent_attempts: usize,
    /// Seed for the trainer's random number generator.
    /// `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl TrainConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, `false` or `None`.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    pub const fn zero() -> TrainConfig {
        TrainConfig {
            thread_count: None,
            validation_mode: false,
            ignore_exceptions: false,
            tournament_rounds: 0,
            max_parent_attempts: 0,
            seed: None,
        }
    }
}

impl Default for TrainConfig {
    fn default() -> TrainConfig {
        TrainConfig {
            thread_count: None,
            validation_mode: false,
            ignore_exceptions: false,
            tournament_rounds: 4,
            max_parent_attempts: 5,
            seed: None,
        }
    }
}
