//! A Population is a collection of individuals.
//! These are grouped into species, which are
//! re-formed every generation by a speciation
//! strategy.
mod config;
pub mod logging;
mod species;

use crate::genome::{GenomeFactory, Individual};
use crate::score::GenomeComparator;
pub use config::PopulationConfig;
pub use species::{Species, SpeciesId};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use std::sync::Arc;

/// A population of individuals, grouped into species.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Population<G> {
    species: Vec<Species<G>>,
    best: Option<Arc<Individual<G>>>,
    next_species_id: usize,
    config: PopulationConfig,
}

impl<G> Population<G> {
    /// Creates an empty population.
    pub fn new(config: PopulationConfig) -> Population<G> {
        Population {
            species: vec![],
            best: None,
            next_species_id: 0,
            config,
        }
    }

    /// Creates a population of `config.size` random genomes
    /// made by `factory`, all placed in one initial species.
    ///
    /// # Examples
    /// ```
    /// use oxievo::{Population, PopulationConfig};
    /// use oxievo_vec::RandomVectorFactory;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = PopulationConfig {
    ///     size: NonZeroUsize::new(20).unwrap(),
    ///     ..PopulationConfig::default()
    /// };
    /// let factory = RandomVectorFactory::new(3, -1.0, 1.0);
    /// let population = Population::initialize(config, &factory, &mut StdRng::seed_from_u64(0));
    ///
    /// assert_eq!(population.len(), 20);
    /// assert_eq!(population.species().count(), 1);
    /// ```
    pub fn initialize<F>(
        config: PopulationConfig,
        factory: &F,
        rng: &mut dyn RngCore,
    ) -> Population<G>
    where
        F: GenomeFactory<G> + ?Sized,
    {
        let genomes = (0..config.size.get()).map(|_| factory.factor(rng)).collect();
        let mut population = Population::new(config);
        population.add_species(genomes);
        population
    }

    /// Creates a population seeded with the specified genomes.
    /// Each vector of genomes is assigned to its own species.
    ///
    /// Returns `None` if there are more seed genomes than
    /// the configured population size. If there are fewer,
    /// the first generation fills the population up.
    ///
    /// # Examples
    /// ```
    /// use oxievo::{Population, PopulationConfig};
    /// use oxievo_vec::RealVectorGenome;
    ///
    /// let seeds = vec![
    ///     vec![RealVectorGenome::new(vec![0.0]), RealVectorGenome::new(vec![0.1])],
    ///     vec![RealVectorGenome::new(vec![9.0])],
    /// ];
    /// let population = Population::from_genomes(PopulationConfig::default(), seeds).unwrap();
    ///
    /// assert_eq!(population.species().map(|s| s.len()).collect::<Vec<_>>(), vec![2, 1]);
    /// ```
    pub fn from_genomes(config: PopulationConfig, genomes: Vec<Vec<G>>) -> Option<Population<G>> {
        let seed_count: usize = genomes.iter().map(Vec::len).sum();
        if seed_count > config.size.get() {
            return None;
        }
        let mut population = Population::new(config);
        for species_genomes in genomes.into_iter().filter(|g| !g.is_empty()) {
            population.add_species(species_genomes);
        }
        Some(population)
    }

    /// Adds a new species holding `genomes`, if any.
    fn add_species(&mut self, genomes: Vec<G>) {
        let mut individuals = genomes.into_iter().map(|g| Arc::new(Individual::new(g, 0)));
        if let Some(first) = individuals.next() {
            let mut species = Species::new(self.assign_species_id(), first);
            individuals.for_each(|i| species.add(i));
            self.species.push(species);
        }
    }

    /// Returns a fresh species identifier.
    pub fn assign_species_id(&mut self) -> SpeciesId {
        let id = SpeciesId(self.next_species_id);
        self.next_species_id += 1;
        id
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    /// Target number of individuals per generation.
    pub fn size(&self) -> usize {
        self.config.size.get()
    }

    pub fn max_individual_size(&self) -> usize {
        self.config.max_individual_size
    }

    /// Current number of individuals across all species.
    pub fn len(&self) -> usize {
        self.species.iter().map(Species::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.species.iter().all(Species::is_empty)
    }

    /// Returns an iterator over all current individuals.
    pub fn genomes(&self) -> impl Iterator<Item = &Arc<Individual<G>>> {
        self.species.iter().flat_map(|s| s.members())
    }

    /// Returns an iterator over all current species.
    pub fn species(&self) -> impl Iterator<Item = &Species<G>> {
        self.species.iter()
    }

    pub(crate) fn species_slice(&self) -> &[Species<G>] {
        &self.species
    }

    pub(crate) fn species_mut(&mut self) -> &mut Vec<Species<G>> {
        &mut self.species
    }

    /// Removes and returns every individual, leaving the
    /// (now empty) species and their bookkeeping in place.
    pub fn take_genomes(&mut self) -> Vec<Arc<Individual<G>>> {
        self.species
            .iter_mut()
            .flat_map(|s| s.take_members())
            .collect()
    }

    /// Best individual ever recorded for this population.
    pub fn best(&self) -> Option<&Arc<Individual<G>>> {
        self.best.as_ref()
    }

    pub fn set_best(&mut self, best: Arc<Individual<G>>) {
        self.best = Some(best);
    }

    /// Removes all species and individuals.
    pub fn clear(&mut self) {
        self.species.clear();
    }

    /// Sorts every species' members best-first, and the
    /// species by their best member.
    pub fn sort(&mut self, comparator: &GenomeComparator) {
        for species in &mut self.species {
            species.sort(comparator);
        }
        self.species.sort_by(|a, b| match (a.members().first(), b.members().first()) {
            (Some(a), Some(b)) => comparator.compare(a, b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScoreDirection;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::num::NonZeroUsize;

    fn config(size: usize) -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(size).unwrap(),
            ..PopulationConfig::default()
        }
    }

    #[test]
    fn seeding_beyond_size_fails() {
        assert!(Population::from_genomes(config(2), vec![vec![1, 2], vec![3]]).is_none());
        let population = Population::from_genomes(config(3), vec![vec![1, 2], vec![], vec![3]]).unwrap();
        assert_eq!(population.species().count(), 2);
        assert_eq!(
            population.species().map(|s| s.id()).collect::<Vec<_>>(),
            vec![SpeciesId(0), SpeciesId(1)]
        );
    }

    #[test]
    fn initialize_uses_factory() {
        let factory = |rng: &mut dyn RngCore| rng.gen_range(0..100u32);
        let population = Population::initialize(config(30), &factory, &mut StdRng::seed_from_u64(1));
        assert_eq!(population.len(), 30);
        assert!(population.genomes().all(|g| *g.genome() < 100));
    }

    #[test]
    fn sort_is_best_first() {
        let mut population = Population::from_genomes(config(5), vec![vec![1u32, 2], vec![5, 3, 4]]).unwrap();
        let mut rescored = population.take_genomes();
        for individual in &mut rescored {
            let individual = Arc::make_mut(individual);
            individual.set_score(*individual.genome() as f64);
        }
        let species = population.species_mut();
        for (i, individual) in rescored.into_iter().enumerate() {
            species[if i < 2 { 0 } else { 1 }].add(individual);
        }

        population.sort(&GenomeComparator::best(ScoreDirection::Minimize));
        let order: Vec<u32> = population.genomes().map(|g| *g.genome()).collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5]);

        population.sort(&GenomeComparator::best(ScoreDirection::Maximize));
        let order: Vec<u32> = population.genomes().map(|g| *g.genome()).collect();
        assert_eq!(order, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn take_genomes_empties_species() {
        let mut population = Population::from_genomes(config(4), vec![vec![1, 2], vec![3]]).unwrap();
        let taken = population.take_genomes();
        assert_eq!(taken.len(), 3);
        assert!(population.is_empty());
        assert_eq!(population.species().count(), 2);
    }
}
