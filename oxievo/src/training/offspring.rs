//! State shared by the workers of one generation.
use super::errors::TrainError;
use crate::genome::Individual;
use crate::score::GenomeComparator;

use ahash::RandomState;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

struct Members<G> {
    members: Vec<Arc<Individual<G>>>,
    best: Arc<Individual<G>>,
    old_best: Arc<Individual<G>>,
    // Addresses of the inserted individuals.
    seen: HashSet<usize, RandomState>,
}

/// The population being built during a generation.
///
/// It is seeded with the previous generation's best
/// individual, and workers insert children into it
/// concurrently until it reaches its capacity.
///
/// # Examples
/// ```
/// use oxievo::training::offspring::NewPopulation;
/// use oxievo::{GenomeComparator, Individual, ScoreDirection};
/// use std::sync::Arc;
///
/// let mut elite = Individual::new(1u8, 0);
/// elite.set_score(1.0);
/// let comparator = GenomeComparator::best(ScoreDirection::Maximize);
/// let buffer = NewPopulation::new(2, Arc::new(elite), comparator, true);
///
/// let mut child = Individual::new(2u8, 1);
/// child.set_score(2.0);
/// assert!(buffer.add_child(Arc::new(child)).unwrap());
/// assert!(!buffer.add_child(Arc::new(Individual::new(3u8, 1))).unwrap());
/// assert_eq!(buffer.best().score(), 2.0);
/// ```
pub struct NewPopulation<G> {
    capacity: usize,
    comparator: GenomeComparator,
    validation_mode: bool,
    inner: Mutex<Members<G>>,
}

impl<G> NewPopulation<G> {
    /// Creates a buffer of `capacity` individuals holding `elite`.
    pub fn new(
        capacity: usize,
        elite: Arc<Individual<G>>,
        comparator: GenomeComparator,
        validation_mode: bool,
    ) -> NewPopulation<G> {
        let mut seen = HashSet::with_capacity_and_hasher(capacity, RandomState::new());
        seen.insert(address(&elite));
        let mut members = Vec::with_capacity(capacity);
        members.push(elite.clone());
        NewPopulation {
            capacity,
            comparator,
            validation_mode,
            inner: Mutex::new(Members {
                members,
                best: elite.clone(),
                old_best: elite,
                seen,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Members<G>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `child` into the new population.
    ///
    /// Returns `Ok(false)` if the population is already full,
    /// and `Ok(true)` otherwise. The previous best individual
    /// is never inserted twice.
    ///
    /// # Errors
    /// In validation mode, inserting an individual that is
    /// already present is an error.
    pub fn add_child(&self, child: Arc<Individual<G>>) -> Result<bool, TrainError> {
        let mut inner = self.lock();
        if inner.members.len() >= self.capacity {
            return Ok(false);
        }
        if Arc::ptr_eq(&child, &inner.old_best) {
            return Ok(true);
        }
        if !inner.seen.insert(address(&child)) && self.validation_mode {
            return Err(TrainError::DuplicateInsertion);
        }
        if self.comparator.is_better_than(&child, &inner.best) {
            inner.best = child.clone();
        }
        inner.members.push(child);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Best individual inserted so far.
    pub fn best(&self) -> Arc<Individual<G>> {
        self.lock().best.clone()
    }

    /// Consumes the buffer, returning its members and best individual.
    pub fn into_parts(self) -> (Vec<Arc<Individual<G>>>, Arc<Individual<G>>) {
        let inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        (inner.members, inner.best)
    }
}

fn address<G>(individual: &Arc<Individual<G>>) -> usize {
    Arc::as_ptr(individual) as usize
}

/// Holds the first error reported by any worker.
/// Later reports are dropped.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    error: OnceLock<TrainError>,
}

impl ErrorSlot {
    pub fn new() -> ErrorSlot {
        ErrorSlot::default()
    }

    /// Records `error` if no error has been recorded yet.
    /// Returns whether it was recorded.
    pub fn report(&self, error: TrainError) -> bool {
        self.error.set(error).is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.error.get().is_some()
    }

    pub fn get(&self) -> Option<&TrainError> {
        self.error.get()
    }

    pub fn into_inner(self) -> Option<TrainError> {
        self.error.into_inner()
    }
}
