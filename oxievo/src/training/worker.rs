//! Offspring production for a single species.
use super::config::TrainConfig;
use super::errors::TrainError;
use super::offspring::{ErrorSlot, NewPopulation};
use crate::codec::Phenotype;
use crate::genome::{Genome, Individual};
use crate::operators::OperationList;
use crate::populations::Species;
use crate::score::{GenomeComparator, ScoreAdapter};
use crate::selection::SelectionOperator;

use log::{trace, warn};
use rand::rngs::StdRng;

use std::sync::Arc;

/// Result of a single reproduction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Children accepted into the new population.
    Accepted(usize),
    /// The new population filled up.
    PopulationFull,
}

/// Everything a worker reads but does not own.
pub(crate) struct Shared<'a, G, P> {
    pub adapter: &'a ScoreAdapter<G, P>,
    pub operators: &'a OperationList<G>,
    pub selection: &'a dyn SelectionOperator<G>,
    pub new_population: &'a NewPopulation<G>,
    pub errors: &'a ErrorSlot,
    pub config: &'a TrainConfig,
    pub generation: usize,
    pub max_individual_size: usize,
}

/// Produces one species' allotted offspring.
pub(crate) struct SpeciesWorker<'a, G, P> {
    species: &'a Species<G>,
    shared: &'a Shared<'a, G, P>,
    comparator: GenomeComparator,
    rng: StdRng,
}

impl<'a, G, P> SpeciesWorker<'a, G, P>
where
    G: Genome,
    P: Phenotype,
{
    pub(crate) fn new(
        species: &'a Species<G>,
        shared: &'a Shared<'a, G, P>,
        rng: StdRng,
    ) -> SpeciesWorker<'a, G, P> {
        SpeciesWorker {
            species,
            shared,
            comparator: shared.adapter.selection_comparator(),
            rng,
        }
    }

    /// Produces children until the species' offspring count is
    /// reached, the new population is full or an error is reported.
    /// Returns the number of accepted children.
    pub(crate) fn run(mut self) -> usize {
        let target = self.species.offspring_count();
        let mut accepted = 0;
        while accepted < target {
            if self.shared.errors.is_set() {
                break;
            }
            match self.attempt(target - accepted) {
                Ok(Outcome::Accepted(count)) => accepted += count,
                Ok(Outcome::PopulationFull) => break,
                Err(error) => {
                    if self.shared.config.ignore_exceptions && error.is_offspring_failure() {
                        warn!("ignoring error in species {}: {}", self.species.id().0, error);
                        continue;
                    }
                    if self.shared.errors.report(error) {
                        warn!("species {} failed, stopping generation", self.species.id().0);
                    }
                    break;
                }
            }
        }
        accepted
    }

    /// Performs one operation, inserting at most `remaining` children.
    fn attempt(&mut self, remaining: usize) -> Result<Outcome, TrainError> {
        let available = self.species.len();
        let operators = self.shared.operators;
        // Species smaller than every operator's parent count still
        // reproduce, with parent 1 standing in for the missing ones.
        let mut operator = match operators.pick_operator(&mut self.rng, available) {
            Some(operator) => operator,
            None => operators
                .pick_operator(&mut self.rng, usize::MAX)
                .ok_or(TrainError::NoEligibleOperator(available))?,
        };
        let mut parents = self.select_parents(operator.parents_needed())?;
        if parents.len() > 1 && parents[1..].iter().all(|p| Arc::ptr_eq(p, parents[0])) {
            // No distinct partner was found: reproduce asexually
            // if possible, or hand the operator identical parents.
            if let Some(asexual) = operators.pick_operator(&mut self.rng, 1) {
                operator = asexual;
                parents.truncate(operator.parents_needed());
            }
        }

        let genomes: Vec<&G> = parents.iter().map(|p| p.genome()).collect();
        let mut children = Vec::with_capacity(operator.max_offspring());
        operator
            .perform_operation(&mut self.rng, &genomes, &mut children)
            .map_err(TrainError::Operator)?;

        self.insert_children(children, remaining)
    }

    /// Selects `count` parents. Every parent after the first is
    /// redrawn while it is identical to the first, up to the
    /// configured number of attempts.
    fn select_parents(&mut self, count: usize) -> Result<Vec<&'a Arc<Individual<G>>>, TrainError> {
        let members = self.species.members();
        let first = self.select()?;
        let mut parents = Vec::with_capacity(count);
        parents.push(&members[first]);
        for _ in 1..count {
            let mut other = self.select()?;
            let mut attempts = 1;
            while other == first && attempts < self.shared.config.max_parent_attempts {
                other = self.select()?;
                attempts += 1;
            }
            parents.push(&members[other]);
        }
        Ok(parents)
    }

    fn select(&mut self) -> Result<usize, TrainError> {
        self.shared
            .selection
            .perform_selection(&mut self.rng, self.species, &self.comparator)
            .ok_or(TrainError::EmptySpecies)
    }

    /// Scores and inserts up to `remaining` children. Fails
    /// without inserting anything if one of them is too large.
    fn insert_children(&mut self, children: Vec<G>, remaining: usize) -> Result<Outcome, TrainError> {
        let generation = self.shared.generation;
        let max = self.shared.max_individual_size;
        if let Some(size) = children.iter().take(remaining).map(G::size).find(|size| *size > max) {
            trace!(
                "child of size {} in species {} exceeds {}",
                size,
                self.species.id().0,
                max
            );
            return Err(TrainError::OversizedOffspring { size, max });
        }
        let mut accepted = 0;
        for genome in children.into_iter().take(remaining) {
            let mut child = Individual::new(genome, generation);
            self.shared.adapter.calculate_score(&mut child, generation)?;
            if !self.shared.new_population.add_child(Arc::new(child))? {
                return Ok(Outcome::PopulationFull);
            }
            accepted += 1;
        }
        Ok(Outcome::Accepted(accepted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::EvolutionaryOperator;
    use crate::{BoxError, IdentityCodec, ScoreDirection, ScoreFunction, SpeciesId, TournamentSelection};
    use rand::{RngCore, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct Value(f64);

    impl Genome for Value {
        fn size(&self) -> usize {
            1
        }
    }

    impl Phenotype for Value {}

    /// Averages its parents, counting calls with identical parents.
    struct Average {
        identical: Arc<AtomicUsize>,
    }

    impl EvolutionaryOperator<Value> for Average {
        fn parents_needed(&self) -> usize {
            2
        }

        fn max_offspring(&self) -> usize {
            1
        }

        fn perform_operation(
            &self,
            _rng: &mut dyn RngCore,
            parents: &[&Value],
            children: &mut Vec<Value>,
        ) -> Result<(), BoxError> {
            if std::ptr::eq(parents[0], parents[1]) {
                self.identical.fetch_add(1, Ordering::Relaxed);
            }
            children.push(Value((parents[0].0 + parents[1].0) / 2.0));
            Ok(())
        }
    }

    struct Failing;

    impl EvolutionaryOperator<Value> for Failing {
        fn parents_needed(&self) -> usize {
            1
        }

        fn max_offspring(&self) -> usize {
            1
        }

        fn perform_operation(
            &self,
            _rng: &mut dyn RngCore,
            _parents: &[&Value],
            _children: &mut Vec<Value>,
        ) -> Result<(), BoxError> {
            Err("operator failure".into())
        }
    }

    /// Everything a worker borrows, owned for the length of a test.
    struct Fixture {
        adapter: ScoreAdapter<Value, Value>,
        operators: OperationList<Value>,
        selection: TournamentSelection,
        new_population: NewPopulation<Value>,
        errors: ErrorSlot,
        config: TrainConfig,
        identical: Arc<AtomicUsize>,
    }

    impl Fixture {
        /// A fixture breeding with `Average` into a new
        /// population of `capacity` individuals.
        fn averaging(capacity: usize) -> Fixture {
            let identical = Arc::new(AtomicUsize::new(0));
            let mut operators = OperationList::new();
            operators.add(
                1.0,
                Average {
                    identical: identical.clone(),
                },
            );
            Fixture::with_operators(capacity, operators, identical)
        }

        fn with_operators(
            capacity: usize,
            operators: OperationList<Value>,
            identical: Arc<AtomicUsize>,
        ) -> Fixture {
            let mut elite = Individual::new(Value(100.0), 0);
            elite.set_score(100.0);
            Fixture {
                adapter: ScoreAdapter::new(IdentityCodec, ScoreFunction::maximize(|v: &Value| v.0)),
                operators,
                selection: TournamentSelection::default(),
                new_population: NewPopulation::new(
                    capacity,
                    Arc::new(elite),
                    GenomeComparator::best(ScoreDirection::Maximize),
                    true,
                ),
                errors: ErrorSlot::new(),
                config: TrainConfig::default(),
                identical,
            }
        }

        fn shared(&self, max_individual_size: usize) -> Shared<'_, Value, Value> {
            Shared {
                adapter: &self.adapter,
                operators: &self.operators,
                selection: &self.selection,
                new_population: &self.new_population,
                errors: &self.errors,
                config: &self.config,
                generation: 1,
                max_individual_size,
            }
        }
    }

    fn species(values: &[f64], offspring: usize) -> Species<Value> {
        let mut individuals = values.iter().map(|v| {
            let mut individual = Individual::new(Value(*v), 0);
            individual.set_score(*v);
            individual.set_adjusted_score(*v);
            Arc::new(individual)
        });
        let mut species = Species::new(SpeciesId(0), individuals.next().unwrap());
        individuals.for_each(|i| species.add(i));
        species.set_offspring(1.0, offspring);
        species
    }

    #[test]
    fn fills_the_allotted_offspring() {
        let fixture = Fixture::averaging(20);
        let shared = fixture.shared(usize::MAX);
        let species = species(&[1.0, 2.0, 3.0], 12);
        let accepted = SpeciesWorker::new(&species, &shared, StdRng::seed_from_u64(9)).run();
        assert_eq!(accepted, 12);
        assert_eq!(fixture.new_population.len(), 13);
        assert!(!fixture.errors.is_set());

        let (members, _) = fixture.new_population.into_parts();
        assert!(members[1..].iter().all(|m| m.birth_generation() == 1));
        assert!(members[1..].iter().all(|m| m.score() == m.genome().0));
    }

    #[test]
    fn lone_members_breed_with_themselves() {
        let fixture = Fixture::averaging(10);
        let shared = fixture.shared(usize::MAX);
        let lone = species(&[1.0], 3);
        let accepted = SpeciesWorker::new(&lone, &shared, StdRng::seed_from_u64(1)).run();
        assert_eq!(accepted, 3);
        assert!(!fixture.errors.is_set());
        assert_eq!(fixture.identical.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn empty_operator_lists_are_reported() {
        let fixture = Fixture::with_operators(10, OperationList::new(), Arc::default());
        let shared = fixture.shared(usize::MAX);
        let species = species(&[1.0, 2.0], 3);
        SpeciesWorker::new(&species, &shared, StdRng::seed_from_u64(1)).run();
        assert!(matches!(
            fixture.errors.get(),
            Some(TrainError::NoEligibleOperator(2))
        ));
    }

    #[test]
    fn errors_stop_the_worker_unless_ignored() {
        let mut operators = OperationList::new();
        operators.add(1.0, Failing);
        let fixture = Fixture::with_operators(10, operators, Arc::default());
        let shared = fixture.shared(usize::MAX);
        let species = species(&[1.0, 2.0], 5);
        let accepted = SpeciesWorker::new(&species, &shared, StdRng::seed_from_u64(2)).run();
        assert_eq!(accepted, 0);
        assert!(matches!(fixture.errors.get(), Some(TrainError::Operator(_))));
    }

    #[test]
    fn oversized_children_are_rejected() {
        let fixture = Fixture::averaging(10);
        let shared = fixture.shared(1);
        let species = species(&[1.0, 2.0], 4);
        let mut worker = SpeciesWorker::new(&species, &shared, StdRng::seed_from_u64(4));
        let outcome = worker.insert_children(vec![Value(1.0), Value(2.0)], 1).unwrap();
        assert_eq!(outcome, Outcome::Accepted(1));

        let strict = fixture.shared(0);
        let mut worker = SpeciesWorker::new(&species, &strict, StdRng::seed_from_u64(4));
        assert!(matches!(
            worker.insert_children(vec![Value(1.0)], 1),
            Err(TrainError::OversizedOffspring { size: 1, max: 0 })
        ));
        assert_eq!(fixture.new_population.len(), 2);

        // The worker stops instead of redrawing forever.
        let accepted = SpeciesWorker::new(&species, &strict, StdRng::seed_from_u64(5)).run();
        assert_eq!(accepted, 0);
        assert!(matches!(
            fixture.errors.get(),
            Some(TrainError::OversizedOffspring { .. })
        ));
    }

    #[test]
    fn full_population_stops_the_worker() {
        let fixture = Fixture::averaging(3);
        let shared = fixture.shared(usize::MAX);
        let species = species(&[1.0, 2.0], 5);
        let accepted = SpeciesWorker::new(&species, &shared, StdRng::seed_from_u64(5)).run();
        assert_eq!(accepted, 2);
        assert!(!fixture.errors.is_set());
    }

    #[test]
    fn identical_parents_fall_back_to_duplicates_without_asexual_operators() {
        let mut fixture = Fixture::averaging(200);
        fixture.config.max_parent_attempts = 1;
        // Huge tournaments on two members always pick the better one.
        fixture.selection = TournamentSelection::new(64);
        let shared = fixture.shared(usize::MAX);
        let species = species(&[1.0, 2.0], 50);
        let accepted = SpeciesWorker::new(&species, &shared, StdRng::seed_from_u64(6)).run();
        assert_eq!(accepted, 50);
        assert_eq!(fixture.identical.load(Ordering::Relaxed), 50);
    }
}
