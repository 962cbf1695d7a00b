use crate::genome::Individual;
use crate::score::{GenomeComparator, ScoreDirection};

use serde::{Deserialize, Serialize};

use std::fmt;
use std::sync::Arc;

/// Species identifier, assigned in order
/// of creation within a population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub usize);

/// Species are groups of genomes sharing ancestry
/// or structural similarity. Reproduction happens
/// within a species, which protects novel structures
/// from competing with the whole population at once.
///
/// A species keeps track of its age, the best score
/// it has ever seen, and how many generations have
/// passed without improving on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species<G> {
    id: SpeciesId,
    members: Vec<Arc<Individual<G>>>,
    leader: Arc<Individual<G>>,
    age: usize,
    best_score: Option<f64>,
    gens_no_improvement: usize,
    #[serde(skip)]
    offspring_share: f64,
    #[serde(skip)]
    offspring_count: usize,
}

impl<G> Species<G> {
    /// Creates a new species with `first` as its
    /// only member and leader.
    pub fn new(id: SpeciesId, first: Arc<Individual<G>>) -> Species<G> {
        Species {
            id,
            members: vec![first.clone()],
            leader: first,
            age: 0,
            best_score: None,
            gens_no_improvement: 0,
            offspring_share: 0.0,
            offspring_count: 0,
        }
    }

    pub fn id(&self) -> SpeciesId {
        self.id
    }

    /// Returns the species' members.
    pub fn members(&self) -> &[Arc<Individual<G>>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds an individual to the species.
    pub fn add(&mut self, individual: Arc<Individual<G>>) {
        self.members.push(individual);
    }

    /// Returns the species' leader, its best member as of
    /// the latest speciation. Distance-based speciation
    /// uses the leader as the species' representative, so
    /// it may no longer be a member of the population.
    pub fn leader(&self) -> &Arc<Individual<G>> {
        &self.leader
    }

    /// Number of speciation passes the species has survived.
    pub fn age(&self) -> usize {
        self.age
    }

    /// Best raw score ever seen in the species, or `None`
    /// before its first evaluation.
    pub fn best_score(&self) -> Option<f64> {
        self.best_score
    }

    pub fn gens_no_improvement(&self) -> usize {
        self.gens_no_improvement
    }

    /// Share of offspring computed during the latest allotment.
    pub fn offspring_share(&self) -> f64 {
        self.offspring_share
    }

    /// Number of offspring the species is to produce
    /// in the next generation.
    pub fn offspring_count(&self) -> usize {
        self.offspring_count
    }

    pub(crate) fn set_offspring(&mut self, share: f64, count: usize) {
        self.offspring_share = share;
        self.offspring_count = count;
    }

    /// Restores persisted bookkeeping.
    pub fn with_bookkeeping(
        mut self,
        age: usize,
        best_score: Option<f64>,
        gens_no_improvement: usize,
    ) -> Species<G> {
        self.age = age;
        self.best_score = best_score;
        self.gens_no_improvement = gens_no_improvement;
        self
    }

    /// Removes all members ahead of re-speciation. Species
    /// that have been evaluated before grow one generation older.
    pub fn purge(&mut self) {
        self.members.clear();
        if self.best_score.is_some() {
            self.age += 1;
        }
        self.offspring_share = 0.0;
        self.offspring_count = 0;
    }

    /// Removes and returns all members without
    /// touching the bookkeeping.
    pub(crate) fn take_members(&mut self) -> Vec<Arc<Individual<G>>> {
        std::mem::take(&mut self.members)
    }

    /// Returns the best member under `comparator`.
    pub fn champion(&self, comparator: &GenomeComparator) -> Option<&Arc<Individual<G>>> {
        self.members
            .iter()
            .reduce(|best, m| if comparator.is_better_than(m, best) { m } else { best })
    }

    /// Makes the best member the leader and updates the
    /// stagnation bookkeeping: the counter resets when the
    /// best score strictly improves, and grows otherwise.
    pub fn update_best(&mut self, comparator: &GenomeComparator) {
        let champion = match self.champion(comparator) {
            Some(champion) => champion.clone(),
            None => return,
        };
        let score = comparator.score_of(&champion);
        match self.best_score {
            Some(best) if !comparator.is_score_better(score, best) => {
                self.gens_no_improvement += 1;
            }
            _ => {
                self.best_score = Some(score);
                self.gens_no_improvement = 0;
            }
        }
        self.leader = champion;
    }

    /// Returns whether `individual` is a member, by identity.
    pub fn contains(&self, individual: &Arc<Individual<G>>) -> bool {
        self.members.iter().any(|m| Arc::ptr_eq(m, individual))
    }

    /// Returns the species' share of the next generation's
    /// offspring: how far, on average, its members' adjusted
    /// scores are from `worst_reference`, the worst finite
    /// adjusted score in the population. Non-finite scores
    /// are ignored.
    pub fn calculate_share(&self, comparator: &GenomeComparator, worst_reference: f64) -> f64 {
        let distances: Vec<f64> = self
            .members
            .iter()
            .map(|m| m.adjusted_score())
            .filter(|s| s.is_finite())
            .map(|s| match comparator.direction() {
                ScoreDirection::Minimize => worst_reference - s,
                ScoreDirection::Maximize => s - worst_reference,
            })
            .collect();
        if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>().max(0.0) / distances.len() as f64
        }
    }

    /// Sorts members best-first.
    pub(crate) fn sort(&mut self, comparator: &GenomeComparator) {
        self.members.sort_by(|a, b| comparator.compare(a, b));
    }
}

impl<G> fmt::Display for Species<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Species {}: best={}, members={}, age={}, no_improv={}, share={:.3}, offspring={}]",
            self.id.0,
            self.best_score
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "n/a".into()),
            self.members.len(),
            self.age,
            self.gens_no_improvement,
            self.offspring_share,
            self.offspring_count
        )
    }
}
