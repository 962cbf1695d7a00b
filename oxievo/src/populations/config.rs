use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for population generation
/// and evolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the population. Every generation
    /// is filled to exactly this many individuals.
    pub size: NonZeroUsize,
    /// Largest genome size, as reported by
    /// [`Genome::size`], accepted into the population.
    /// A larger child fails the generation, unless
    /// training ignores offspring errors.
    ///
    /// [`Genome::size`]: crate::Genome::size
    pub max_individual_size: usize,
    /// Number of generations without improvement
    /// after which a species is considered
    /// _stagnated_ and stops receiving offspring,
    /// unless it holds the population's best genome.
    pub stagnation_threshold: NonZeroUsize,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, or in the case of
    /// `NonZeroUsize`s, 1. The maximum individual size
    /// is unbounded, as a limit of 0 would reject every child.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use oxievo::PopulationConfig;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = PopulationConfig {
    ///     size: NonZeroUsize::new(50).unwrap(),
    ///     max_individual_size: 100,
    ///     ..PopulationConfig::zero()
    /// };
    /// assert_eq!(config.stagnation_threshold.get(), 1);
    /// assert_eq!(PopulationConfig::zero().max_individual_size, usize::MAX);
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::MIN,
            max_individual_size: usize::MAX,
            stagnation_threshold: NonZeroUsize::MIN,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN),
            max_individual_size: usize::MAX,
            stagnation_threshold: NonZeroUsize::new(15).unwrap_or(NonZeroUsize::MIN),
        }
    }
}
