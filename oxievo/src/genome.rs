use rand::RngCore;
use serde::{Deserialize, Serialize};

/// An interface for genetic payloads that can be evolved.
pub trait Genome: Clone + Send + Sync {
    /// Returns the genome's size, e.g. its gene count.
    ///
    /// Offspring larger than the population's
    /// [maximum individual size] are discarded.
    ///
    /// [maximum individual size]: crate::PopulationConfig::max_individual_size
    fn size(&self) -> usize;

    /// Returns the genetic distance between two genomes.
    ///
    /// Only distance-based speciation makes use of this,
    /// so encodings without a meaningful metric may keep
    /// the default, which makes all genomes compatible.
    fn genetic_distance(&self, _other: &Self) -> f64 {
        0.0
    }
}

/// Creates genomes when a population is initialized.
pub trait GenomeFactory<G> {
    /// Returns a new, randomized genome.
    fn factor(&self, rng: &mut dyn RngCore) -> G;

    /// Returns a copy of `other`.
    fn factor_from(&self, other: &G) -> G
    where
        G: Clone,
    {
        other.clone()
    }
}

impl<G, F> GenomeFactory<G> for F
where
    F: Fn(&mut dyn RngCore) -> G,
{
    fn factor(&self, rng: &mut dyn RngCore) -> G {
        self(rng)
    }
}

/// A genome together with its scores.
///
/// Individuals are shared as `Arc<Individual<G>>` once
/// they become members of a population, and are compared
/// by pointer identity from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual<G> {
    genome: G,
    score: f64,
    adjusted_score: f64,
    birth_generation: usize,
}

impl<G> Individual<G> {
    /// Wraps an unscored genome born in `birth_generation`.
    ///
    /// Scores start out as NaN, which every comparator
    /// ranks below any real score.
    ///
    /// # Examples
    /// ```
    /// use oxievo::Individual;
    ///
    /// let individual = Individual::new(vec![1.0, 2.0], 3);
    /// assert!(individual.score().is_nan());
    /// assert_eq!(individual.birth_generation(), 3);
    /// ```
    pub fn new(genome: G, birth_generation: usize) -> Individual<G> {
        Individual {
            genome,
            score: f64::NAN,
            adjusted_score: f64::NAN,
            birth_generation,
        }
    }

    /// Returns the genetic payload.
    pub fn genome(&self) -> &G {
        &self.genome
    }

    /// Returns the genetic payload mutably.
    pub fn genome_mut(&mut self) -> &mut G {
        &mut self.genome
    }

    /// Unwraps the genetic payload.
    pub fn into_genome(self) -> G {
        self.genome
    }

    /// Returns the raw score.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Sets the raw score.
    pub fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    /// Returns the score after adjustments.
    pub fn adjusted_score(&self) -> f64 {
        self.adjusted_score
    }

    /// Sets the score after adjustments.
    pub fn set_adjusted_score(&mut self, adjusted_score: f64) {
        self.adjusted_score = adjusted_score;
    }

    /// Returns the generation the individual was born in.
    pub fn birth_generation(&self) -> usize {
        self.birth_generation
    }

    /// Stamps the generation the individual was born in.
    pub fn set_birth_generation(&mut self, generation: usize) {
        self.birth_generation = generation;
    }

    /// Number of generations since birth.
    pub fn age(&self, generation: usize) -> usize {
        generation.saturating_sub(self.birth_generation)
    }
}

impl<G: Genome> Individual<G> {
    /// Returns the payload's size.
    pub fn size(&self) -> usize {
        self.genome.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn closures_are_factories() {
        let factory = |rng: &mut dyn RngCore| rng.gen_range(0..10u32);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(factory.factor(&mut rng) < 10);
        }
        assert_eq!(factory.factor_from(&4), 4);
    }

    #[test]
    fn age_saturates() {
        let individual = Individual::new((), 10);
        assert_eq!(individual.age(15), 5);
        assert_eq!(individual.age(3), 0);
    }
}
