//! The generational training loop.
//!
//! Every generation, the best individual is carried over,
//! and each species produces its allotted offspring on a
//! worker of the trainer's thread pool. Once all workers
//! are done, the new generation is re-speciated.
mod config;
mod errors;
pub mod offspring;
mod worker;

pub use config::TrainConfig;
pub use errors::TrainError;

use crate::codec::Phenotype;
use crate::genome::{Genome, Individual};
use crate::operators::{EvolutionaryOperator, OperationList};
use crate::populations::Population;
use crate::score::{AdjustScore, GenomeComparator, ScoreAdapter};
use crate::selection::{SelectionOperator, TournamentSelection};
use crate::speciation::{SingleSpeciation, Speciation};
use crate::stopping::StoppingStrategy;
use errors::Result;
use offspring::{ErrorSlot, NewPopulation};
use worker::{Shared, SpeciesWorker};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use std::num::NonZeroUsize;
use std::sync::Arc;

/// Lifecycle of a [`Trainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    /// Setup has not run yet; it runs on the first iteration.
    Uninitialized,
    /// Ready for the next iteration.
    Ready,
    /// A generation is in progress.
    Running,
    /// A generation failed. No further iterations are possible.
    Faulted,
}

/// Evolves a population.
///
/// # Examples
/// ```
/// use oxievo::{IdentityCodec, Population, PopulationConfig, ScoreAdapter, ScoreFunction, Trainer};
/// use oxievo_vec::{Perturb, RandomVectorFactory, RealVectorGenome};
/// use rand::{rngs::StdRng, SeedableRng};
/// use std::num::NonZeroUsize;
///
/// let config = PopulationConfig {
///     size: NonZeroUsize::new(30).unwrap(),
///     ..PopulationConfig::default()
/// };
/// let factory = RandomVectorFactory::new(2, -5.0, 5.0);
/// let population = Population::initialize(config, &factory, &mut StdRng::seed_from_u64(1));
/// let score = ScoreFunction::minimize(|g: &RealVectorGenome| {
///     g.values().iter().map(|x| x * x).sum::<f64>()
/// });
///
/// let mut trainer = Trainer::new(population, ScoreAdapter::new(IdentityCodec, score));
/// trainer.add_operation(1.0, Perturb::new(0.5));
///
/// let start = {
///     trainer.iteration().unwrap();
///     trainer.error()
/// };
/// trainer.iterations(20).unwrap();
/// assert!(trainer.error() <= start);
/// assert_eq!(trainer.population().len(), 30);
/// ```
pub struct Trainer<G, P> {
    population: Population<G>,
    adapter: ScoreAdapter<G, P>,
    operators: OperationList<G>,
    selection: Option<Box<dyn SelectionOperator<G>>>,
    speciation: Box<dyn Speciation<G>>,
    config: TrainConfig,
    state: TrainerState,
    iteration: usize,
    thread_count: usize,
    pool: Option<ThreadPool>,
    rng: StdRng,
}

impl<G, P> Trainer<G, P>
where
    G: Genome + 'static,
    P: Phenotype,
{
    /// Creates a trainer with the default configuration,
    /// tournament selection and a single species.
    pub fn new(population: Population<G>, adapter: ScoreAdapter<G, P>) -> Trainer<G, P> {
        Trainer {
            population,
            adapter,
            operators: OperationList::new(),
            selection: None,
            speciation: Box::new(SingleSpeciation),
            config: TrainConfig::default(),
            state: TrainerState::Uninitialized,
            iteration: 0,
            thread_count: 0,
            pool: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replaces the training configuration, reseeding
    /// the random number generator.
    pub fn with_config(mut self, config: TrainConfig) -> Trainer<G, P> {
        self.rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.config = config;
        self
    }

    /// Replaces the default tournament selection.
    pub fn with_selection<S>(mut self, selection: S) -> Trainer<G, P>
    where
        S: SelectionOperator<G> + 'static,
    {
        self.selection = Some(Box::new(selection));
        self
    }

    /// Replaces the default single-species speciation.
    pub fn with_speciation<S>(mut self, speciation: S) -> Trainer<G, P>
    where
        S: Speciation<G> + 'static,
    {
        self.speciation = Box::new(speciation);
        self
    }

    /// Registers an operator with relative weight `probability`.
    pub fn add_operation<O>(&mut self, probability: f64, operator: O)
    where
        O: EvolutionaryOperator<G> + 'static,
    {
        self.operators.add(probability, operator);
    }

    /// Appends a score adjuster to the scoring chain.
    pub fn add_score_adjuster<A>(&mut self, adjuster: A)
    where
        A: AdjustScore<G> + 'static,
    {
        self.adapter.add_adjuster(adjuster);
    }

    /// Runs a single generation, setting up training first
    /// if this is the first call.
    ///
    /// # Errors
    /// Setup fails if no operators were registered or the
    /// population is empty. A generation fails with the
    /// first error reported by any worker, or an invariant
    /// violation in validation mode; the trainer is then
    /// faulted and every later call fails.
    pub fn iteration(&mut self) -> Result<()> {
        match self.state {
            TrainerState::Faulted => return Err(TrainError::Faulted),
            TrainerState::Uninitialized => self.setup()?,
            TrainerState::Ready | TrainerState::Running => {}
        }
        self.state = TrainerState::Running;
        match self.generation() {
            Ok(()) => {
                self.state = TrainerState::Ready;
                Ok(())
            }
            Err(error) => {
                warn!("generation {} failed: {}", self.iteration, error);
                self.state = TrainerState::Faulted;
                Err(error)
            }
        }
    }

    /// Runs `count` generations.
    pub fn iterations(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.iteration()?;
        }
        Ok(())
    }

    /// Runs generations until `strategy` says to stop.
    /// Returns the number of iterations completed.
    pub fn train_until<S>(&mut self, strategy: &mut S) -> Result<usize>
    where
        S: StoppingStrategy + ?Sized,
    {
        loop {
            self.iteration()?;
            if strategy.should_stop(self.iteration, self.error(), self.adapter.direction()) {
                return Ok(self.iteration);
            }
        }
    }

    fn setup(&mut self) -> Result<()> {
        if self.operators.is_empty() {
            return Err(TrainError::NoOperators);
        }
        if self.population.is_empty() {
            return Err(TrainError::EmptyPopulation);
        }
        if self.selection.is_none() && self.config.tournament_rounds == 0 {
            return Err(TrainError::Configuration(
                "tournament_rounds must be positive".into(),
            ));
        }
        if self.config.thread_count == Some(0) {
            return Err(TrainError::Configuration(
                "thread_count must be positive".into(),
            ));
        }
        self.operators.finalize_structure();

        self.thread_count = if self.adapter.require_single_threaded() {
            1
        } else {
            self.config.thread_count.unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1)
            })
        };
        self.pool = if self.thread_count > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(self.thread_count)
                    .build()?,
            )
        } else {
            None
        };

        let mut genomes = self.population.take_genomes();
        if let Err(error) = self.score_all(&mut genomes) {
            self.state = TrainerState::Faulted;
            return Err(error);
        }
        let comparator = self.adapter.best_comparator();
        let best = genomes
            .iter()
            .reduce(|best, g| if comparator.is_better_than(g, best) { g } else { best })
            .cloned()
            .ok_or(TrainError::EmptyPopulation)?;
        self.population.set_best(best);
        self.speciation
            .perform_speciation(&mut self.population, genomes, &comparator);

        info!(
            "training {} individuals in {} species on {} threads",
            self.population.len(),
            self.population.species().count(),
            self.thread_count
        );
        self.state = TrainerState::Ready;
        Ok(())
    }

    /// Scores individuals, in parallel chunks when running
    /// on more than one thread.
    fn score_all(&self, genomes: &mut [Arc<Individual<G>>]) -> Result<()> {
        let adapter = &self.adapter;
        let generation = self.iteration;
        let score = |chunk: &mut [Arc<Individual<G>>]| -> Result<()> {
            for individual in chunk {
                adapter.calculate_score(Arc::make_mut(individual), generation)?;
            }
            Ok(())
        };
        match &self.pool {
            Some(pool) => {
                let chunk_size = ((genomes.len() + self.thread_count - 1) / self.thread_count).max(1);
                pool.install(|| genomes.par_chunks_mut(chunk_size).try_for_each(score))
            }
            None => score(genomes),
        }
    }

    fn generation(&mut self) -> Result<()> {
        self.iteration += 1;
        let generation = self.iteration;
        let comparator = self.adapter.best_comparator();
        let elite = self
            .population
            .best()
            .cloned()
            .ok_or(TrainError::EmptyPopulation)?;
        let new_population = NewPopulation::new(
            self.population.size(),
            elite.clone(),
            comparator,
            self.config.validation_mode,
        );
        let errors = ErrorSlot::new();

        let default_selection;
        let selection: &dyn SelectionOperator<G> = match &self.selection {
            Some(selection) => selection.as_ref(),
            None => {
                default_selection = TournamentSelection::new(self.config.tournament_rounds);
                &default_selection
            }
        };
        let shared = Shared {
            adapter: &self.adapter,
            operators: &self.operators,
            selection,
            new_population: &new_population,
            errors: &errors,
            config: &self.config,
            generation,
            max_individual_size: self.population.max_individual_size(),
        };
        let all_species = self.population.species_slice();
        let rngs: Vec<StdRng> = all_species
            .iter()
            .map(|_| StdRng::seed_from_u64(self.rng.gen()))
            .collect();

        match &self.pool {
            Some(pool) => pool.scope(|scope| {
                for (species, rng) in all_species.iter().zip(rngs) {
                    let shared = &shared;
                    scope.spawn(move |_| {
                        SpeciesWorker::new(species, shared, rng).run();
                    });
                }
            }),
            None => {
                for (species, rng) in all_species.iter().zip(rngs) {
                    SpeciesWorker::new(species, &shared, rng).run();
                }
            }
        }

        if let Some(error) = errors.into_inner() {
            return Err(error);
        }
        let (members, best) = new_population.into_parts();
        if self.config.validation_mode {
            self.validate(&members, &elite, &best, &comparator)?;
        }
        self.population.set_best(best);
        self.speciation
            .perform_speciation(&mut self.population, members, &comparator);

        debug!(
            "generation {}: best score {}, {} species",
            generation,
            self.error(),
            self.population.species().count()
        );
        Ok(())
    }

    /// Checks the invariants every generation must keep.
    fn validate(
        &self,
        members: &[Arc<Individual<G>>],
        elite: &Arc<Individual<G>>,
        best: &Arc<Individual<G>>,
        comparator: &GenomeComparator,
    ) -> Result<()> {
        if members.len() != self.population.size() {
            return Err(TrainError::PopulationSizeMismatch {
                expected: self.population.size(),
                actual: members.len(),
            });
        }
        if !members.iter().any(|m| Arc::ptr_eq(m, elite)) {
            return Err(TrainError::LostElite);
        }
        if comparator.is_better_than(elite, best) {
            return Err(TrainError::BestScoreRegression {
                previous: elite.score(),
                current: best.score(),
            });
        }
        Ok(())
    }

    /// Best raw score so far, or the worst possible
    /// score before training starts.
    pub fn error(&self) -> f64 {
        self.population
            .best()
            .map(|b| b.score())
            .unwrap_or_else(|| self.adapter.direction().worst_score())
    }

    /// Best individual so far.
    pub fn best_genome(&self) -> Option<&Arc<Individual<G>>> {
        self.population.best()
    }

    /// Decodes the best individual so far.
    pub fn best_phenotype(&self) -> Option<P> {
        self.population
            .best()
            .and_then(|b| self.adapter.decode(b.genome()))
    }

    /// Number of completed iterations.
    pub fn iteration_number(&self) -> usize {
        self.iteration
    }

    pub fn population(&self) -> &Population<G> {
        &self.population
    }

    pub fn into_population(self) -> Population<G> {
        self.population
    }

    pub fn adapter(&self) -> &ScoreAdapter<G, P> {
        &self.adapter
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    /// Number of threads used for training. Known once
    /// the first iteration has run.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Sorts the population best-first.
    pub fn finish_training(&mut self) {
        self.population.sort(&self.adapter.best_comparator());
    }
}
