//! Conditions for ending a training run, checked
//! between generations.
use crate::score::ScoreDirection;

use std::time::{Duration, Instant};

/// Decides whether training should stop after a generation.
pub trait StoppingStrategy {
    /// Called after every generation with the number of
    /// completed iterations and the best raw score so far.
    fn should_stop(&mut self, iteration: usize, best_score: f64, direction: ScoreDirection) -> bool;
}

/// Stops after a fixed number of iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndIterations {
    pub max_iterations: usize,
}

impl EndIterations {
    pub fn new(max_iterations: usize) -> EndIterations {
        EndIterations { max_iterations }
    }
}

impl StoppingStrategy for EndIterations {
    fn should_stop(&mut self, iteration: usize, _best_score: f64, _direction: ScoreDirection) -> bool {
        iteration >= self.max_iterations
    }
}

/// Stops once the best score reaches a target: at or
/// below it when minimizing, at or above it when maximizing.
///
/// # Examples
/// ```
/// use oxievo::stopping::{EndScore, StoppingStrategy};
/// use oxievo::ScoreDirection;
///
/// let mut strategy = EndScore::new(0.01);
/// assert!(!strategy.should_stop(1, 0.5, ScoreDirection::Minimize));
/// assert!(strategy.should_stop(2, 0.005, ScoreDirection::Minimize));
/// assert!(!strategy.should_stop(2, 0.005, ScoreDirection::Maximize));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndScore {
    pub target: f64,
}

impl EndScore {
    pub fn new(target: f64) -> EndScore {
        EndScore { target }
    }
}

impl StoppingStrategy for EndScore {
    fn should_stop(&mut self, _iteration: usize, best_score: f64, direction: ScoreDirection) -> bool {
        match direction {
            ScoreDirection::Minimize => best_score <= self.target,
            ScoreDirection::Maximize => best_score >= self.target,
        }
    }
}

/// Stops once a wall-clock budget is spent. The clock
/// starts at the first check.
#[derive(Debug, Clone, Copy)]
pub struct EndDuration {
    limit: Duration,
    started: Option<Instant>,
}

impl EndDuration {
    pub fn new(limit: Duration) -> EndDuration {
        EndDuration {
            limit,
            started: None,
        }
    }
}

impl StoppingStrategy for EndDuration {
    fn should_stop(&mut self, _iteration: usize, _best_score: f64, _direction: ScoreDirection) -> bool {
        let started = *self.started.get_or_insert_with(Instant::now);
        started.elapsed() >= self.limit
    }
}

/// Stops as soon as any of the strategies would.
impl StoppingStrategy for Vec<Box<dyn StoppingStrategy>> {
    fn should_stop(&mut self, iteration: usize, best_score: f64, direction: ScoreDirection) -> bool {
        self.iter_mut()
            .fold(false, |stop, s| s.should_stop(iteration, best_score, direction) || stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterations() {
        let mut strategy = EndIterations::new(3);
        assert!(!strategy.should_stop(2, 0.0, ScoreDirection::Maximize));
        assert!(strategy.should_stop(3, 0.0, ScoreDirection::Maximize));
    }

    #[test]
    fn nan_never_reaches_a_score() {
        let mut strategy = EndScore::new(1.0);
        assert!(!strategy.should_stop(1, f64::NAN, ScoreDirection::Maximize));
        assert!(!strategy.should_stop(1, f64::NAN, ScoreDirection::Minimize));
    }

    #[test]
    fn zero_duration_stops_immediately() {
        let mut strategy = EndDuration::new(Duration::ZERO);
        assert!(strategy.should_stop(0, 0.0, ScoreDirection::Minimize));
    }

    #[test]
    fn any_of_several() {
        let mut strategies: Vec<Box<dyn StoppingStrategy>> =
            vec![Box::new(EndIterations::new(10)), Box::new(EndScore::new(5.0))];
        assert!(!strategies.should_stop(1, 4.0, ScoreDirection::Maximize));
        assert!(strategies.should_stop(1, 5.0, ScoreDirection::Maximize));
        assert!(strategies.should_stop(10, 0.0, ScoreDirection::Maximize));
    }
}
