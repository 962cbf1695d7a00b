use crate::BoxError;

use thiserror::Error;

/// Errors raised while setting up or running training.
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("population has no genomes")]
    EmptyPopulation,

    #[error("no evolutionary operators registered")]
    NoOperators,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("new population has {actual} individuals, expected {expected}")]
    PopulationSizeMismatch { expected: usize, actual: usize },

    #[error("best genome of the previous generation is missing from the new one")]
    LostElite,

    #[error("best score regressed from {previous} to {current}")]
    BestScoreRegression { previous: f64, current: f64 },

    #[error("individual inserted twice into the new population")]
    DuplicateInsertion,

    #[error("scoring error: {0}")]
    Scoring(BoxError),

    #[error("operator error: {0}")]
    Operator(BoxError),

    #[error("offspring of size {size} exceeds the maximum individual size {max}")]
    OversizedOffspring { size: usize, max: usize },

    #[error("no operator needs at most {0} parents")]
    NoEligibleOperator(usize),

    #[error("cannot select from an empty species")]
    EmptySpecies,

    #[error("training already failed")]
    Faulted,
}

impl TrainError {
    /// Whether the error reports a broken population
    /// invariant, detected in validation mode. These are
    /// never ignored.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            TrainError::PopulationSizeMismatch { .. }
                | TrainError::LostElite
                | TrainError::BestScoreRegression { .. }
                | TrainError::DuplicateInsertion
        )
    }

    /// Whether the error concerns a single offspring: a user
    /// operator or score function failing on it, or the child
    /// being too large. Only these are retried when ignoring
    /// exceptions.
    pub fn is_offspring_failure(&self) -> bool {
        matches!(
            self,
            TrainError::Scoring(_) | TrainError::Operator(_) | TrainError::OversizedOffspring { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TrainError>;
