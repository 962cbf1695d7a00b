//! Genetic operators and the probability-weighted
//! list they are drawn from during reproduction.
use crate::BoxError;

use rand::{Rng, RngCore};

/// A crossover or mutation producing offspring from parents.
pub trait EvolutionaryOperator<G>: Send + Sync {
    /// Number of parents the operator consumes.
    fn parents_needed(&self) -> usize;

    /// Maximum number of children one operation produces.
    fn max_offspring(&self) -> usize;

    /// Produces children from `parents`, pushing them onto `children`.
    ///
    /// `parents` holds exactly [`parents_needed`] genomes. The same
    /// genome may appear more than once if no distinct parents could
    /// be found, and operators must tolerate that.
    ///
    /// [`parents_needed`]: EvolutionaryOperator::parents_needed
    fn perform_operation(
        &self,
        rng: &mut dyn RngCore,
        parents: &[&G],
        children: &mut Vec<G>,
    ) -> Result<(), BoxError>;
}

struct Entry<G> {
    probability: f64,
    operator: Box<dyn EvolutionaryOperator<G>>,
}

/// Operators paired with their relative application
/// probabilities.
///
/// # Examples
/// ```
/// use oxievo::OperationList;
/// use oxievo_vec::{Perturb, Splice};
///
/// let mut operators = OperationList::new();
/// operators.add(0.9, Splice::new(2));
/// operators.add(0.1, Perturb::new(1.0));
/// operators.finalize_structure();
///
/// assert_eq!(operators.max_parents(), 2);
/// assert_eq!(operators.max_offspring(), 2);
/// ```
pub struct OperationList<G> {
    entries: Vec<Entry<G>>,
}

impl<G> Default for OperationList<G> {
    fn default() -> OperationList<G> {
        OperationList::new()
    }
}

impl<G> OperationList<G> {
    pub fn new() -> OperationList<G> {
        OperationList { entries: vec![] }
    }

    /// Registers `operator` with relative weight `probability`.
    /// Weights need not sum to 1.
    pub fn add<O>(&mut self, probability: f64, operator: O)
    where
        O: EvolutionaryOperator<G> + 'static,
    {
        self.entries.push(Entry {
            probability: probability.max(0.0),
            operator: Box::new(operator),
        });
    }

    /// Rescales all weights so they sum to 1.
    pub fn finalize_structure(&mut self) {
        let total: f64 = self.entries.iter().map(|e| e.probability).sum();
        if total > 0.0 {
            for entry in &mut self.entries {
                entry.probability /= total;
            }
        }
    }

    /// Picks an operator at random by weight, among those
    /// needing at most `max_parents` parents.
    ///
    /// Returns `None` if no registered operator qualifies.
    pub fn pick_operator(
        &self,
        rng: &mut dyn RngCore,
        max_parents: usize,
    ) -> Option<&dyn EvolutionaryOperator<G>> {
        let eligible = || {
            self.entries
                .iter()
                .filter(move |e| e.operator.parents_needed() <= max_parents)
        };
        let total: f64 = eligible().map(|e| e.probability).sum();
        if total <= 0.0 {
            // Only zero-weight operators qualify; fall back to the first one.
            return eligible().next().map(|e| e.operator.as_ref());
        }
        let mut spin = rng.gen::<f64>() * total;
        let mut last = None;
        for entry in eligible() {
            if spin < entry.probability {
                return Some(entry.operator.as_ref());
            }
            spin -= entry.probability;
            last = Some(entry.operator.as_ref());
        }
        last
    }

    /// Largest parent count needed by any operator.
    pub fn max_parents(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.operator.parents_needed())
            .max()
            .unwrap_or(0)
    }

    /// Largest offspring count produced by any operator.
    pub fn max_offspring(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.operator.max_offspring())
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(probability, operator)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &dyn EvolutionaryOperator<G>)> {
        self.entries
            .iter()
            .map(|e| (e.probability, e.operator.as_ref()))
    }
}
