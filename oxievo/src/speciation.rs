//! Strategies for grouping a new generation into species,
//! and the allotment of offspring between those species.
use crate::genome::{Genome, Individual};
use crate::populations::{Population, Species};
use crate::score::{GenomeComparator, ScoreDirection};

use log::trace;

use std::sync::Arc;

/// Re-partitions a population into species.
pub trait Speciation<G>: Send {
    /// Places every individual of `genomes` into a species of
    /// `population`, replacing the previous members. Species
    /// are then updated with their best member, empty species
    /// are removed and the next generation's offspring allotted.
    ///
    /// `comparator` is the best-genome comparator.
    fn perform_speciation(
        &mut self,
        population: &mut Population<G>,
        genomes: Vec<Arc<Individual<G>>>,
        comparator: &GenomeComparator,
    );
}

/// Keeps the whole population in a single species.
///
/// The species persists across generations, so its
/// age and stagnation keep accumulating.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleSpeciation;

impl<G> Speciation<G> for SingleSpeciation {
    fn perform_speciation(
        &mut self,
        population: &mut Population<G>,
        genomes: Vec<Arc<Individual<G>>>,
        comparator: &GenomeComparator,
    ) {
        purge_all(population);
        let mut genomes = genomes.into_iter();
        if population.species().next().is_none() {
            match genomes.next() {
                Some(first) => {
                    let id = population.assign_species_id();
                    population.species_mut().push(Species::new(id, first));
                }
                None => return,
            }
        }
        let species = population.species_mut();
        species.truncate(1);
        genomes.for_each(|g| species[0].add(g));
        finish_speciation(population, comparator);
    }
}

/// Groups individuals by genetic distance: an individual joins
/// the first species whose leader lies within the compatibility
/// threshold, or founds a new species otherwise.
///
/// With a `target_species` count, the threshold is nudged by
/// `threshold_step` after every pass, never going below
/// `min_threshold`.
///
/// # Examples
/// ```
/// use oxievo::{Population, PopulationConfig, Speciation, ThresholdSpeciation};
/// use oxievo::{GenomeComparator, ScoreDirection};
/// use oxievo_vec::RealVectorGenome;
///
/// let seeds = vec![vec![
///     RealVectorGenome::new(vec![0.0]),
///     RealVectorGenome::new(vec![0.5]),
///     RealVectorGenome::new(vec![10.0]),
/// ]];
/// let mut population = Population::from_genomes(PopulationConfig::default(), seeds).unwrap();
/// let genomes = population.take_genomes();
///
/// let mut speciation = ThresholdSpeciation::new(1.0);
/// let comparator = GenomeComparator::best(ScoreDirection::Maximize);
/// speciation.perform_speciation(&mut population, genomes, &comparator);
///
/// assert_eq!(population.species().map(|s| s.len()).collect::<Vec<_>>(), vec![2, 1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSpeciation {
    pub compatibility_threshold: f64,
    pub target_species: Option<usize>,
    pub threshold_step: f64,
    pub min_threshold: f64,
}

impl ThresholdSpeciation {
    /// Speciation with a fixed threshold.
    pub fn new(compatibility_threshold: f64) -> ThresholdSpeciation {
        ThresholdSpeciation {
            compatibility_threshold,
            target_species: None,
            threshold_step: 0.0,
            min_threshold: 0.0,
        }
    }

    /// Speciation adapting its threshold towards `target` species.
    pub fn targeting(
        compatibility_threshold: f64,
        target: usize,
        threshold_step: f64,
    ) -> ThresholdSpeciation {
        ThresholdSpeciation {
            compatibility_threshold,
            target_species: Some(target),
            threshold_step,
            min_threshold: threshold_step,
        }
    }

    fn adjust_threshold(&mut self, species_count: usize) {
        let target = match self.target_species {
            Some(target) => target,
            None => return,
        };
        if species_count < target {
            self.compatibility_threshold =
                (self.compatibility_threshold - self.threshold_step).max(self.min_threshold);
        } else if species_count > target {
            self.compatibility_threshold += self.threshold_step;
        }
    }
}

impl<G: Genome> Speciation<G> for ThresholdSpeciation {
    fn perform_speciation(
        &mut self,
        population: &mut Population<G>,
        genomes: Vec<Arc<Individual<G>>>,
        comparator: &GenomeComparator,
    ) {
        purge_all(population);
        for genome in genomes {
            let compatible = population.species_mut().iter_mut().find(|s| {
                s.leader().genome().genetic_distance(genome.genome()) < self.compatibility_threshold
            });
            match compatible {
                Some(species) => species.add(genome),
                None => {
                    let id = population.assign_species_id();
                    population.species_mut().push(Species::new(id, genome));
                }
            }
        }
        finish_speciation(population, comparator);
        self.adjust_threshold(population.species().count());
    }
}

fn purge_all<G>(population: &mut Population<G>) {
    for species in population.species_mut() {
        species.purge();
    }
}

/// Common bookkeeping after individuals have been assigned:
/// leaders and stagnation are updated, empty species dropped
/// and offspring allotted.
fn finish_speciation<G>(population: &mut Population<G>, comparator: &GenomeComparator) {
    let species = population.species_mut();
    species.retain(|s| !s.is_empty());
    for s in species.iter_mut() {
        s.update_best(comparator);
    }
    let total = population.size().saturating_sub(1);
    let stagnation_threshold = population.config().stagnation_threshold.get();
    let best = population.best().cloned();
    allot_offspring(
        population.species_mut(),
        total,
        comparator,
        stagnation_threshold,
        best.as_ref(),
    );
}

/// Distributes `total` offspring between `species`.
///
/// Each species' share is given by [`Species::calculate_share`].
/// Species stagnated for `stagnation_threshold` generations or more
/// get no share, unless they hold `best`. When no species has a
/// positive share, offspring are distributed by member count.
/// The allotted counts always sum to exactly `total`, unless
/// every species is empty.
pub fn allot_offspring<G>(
    species: &mut [Species<G>],
    total: usize,
    comparator: &GenomeComparator,
    stagnation_threshold: usize,
    best: Option<&Arc<Individual<G>>>,
) {
    let worst_reference = worst_finite_score(species, comparator.direction());
    let mut shares: Vec<f64> = species
        .iter()
        .map(|s| {
            let holds_best = best.map_or(false, |b| s.contains(b));
            if s.gens_no_improvement() >= stagnation_threshold && !holds_best {
                trace!("species {} stagnated, no offspring", s.id().0);
                0.0
            } else {
                worst_reference.map_or(0.0, |worst| s.calculate_share(comparator, worst))
            }
        })
        .collect();
    let mut share_sum: f64 = shares.iter().sum();
    if !(share_sum.is_finite() && share_sum > 0.0) {
        shares = species.iter().map(|s| s.len() as f64).collect();
        share_sum = shares.iter().sum();
    }
    if share_sum <= 0.0 {
        for s in species.iter_mut() {
            s.set_offspring(0.0, 0);
        }
        return;
    }
    let scaled: Vec<f64> = shares
        .iter()
        .map(|share| share / share_sum * total as f64)
        .collect();
    let counts = round_retain_sum(&scaled);
    for ((s, share), count) in species.iter_mut().zip(&shares).zip(counts) {
        s.set_offspring(share / share_sum, count);
    }
}

/// Worst finite adjusted score across all species.
fn worst_finite_score<G>(species: &[Species<G>], direction: ScoreDirection) -> Option<f64> {
    species
        .iter()
        .flat_map(|s| s.members())
        .map(|m| m.adjusted_score())
        .filter(|s| s.is_finite())
        .reduce(|worst, s| if direction.is_better(worst, s) { s } else { worst })
}

/// Rounds values to integers, preserving their (rounded) sum.
/// Values with the largest fractional parts are rounded up first.
fn round_retain_sum(values: &[f64]) -> Vec<usize> {
    let total_sum = values.iter().sum::<f64>().round() as usize;
    let mut truncated: Vec<(usize, usize, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let u = f.floor();
            let e = f - u;
            (i, u as usize, e)
        })
        .collect();
    let truncated_sum: usize = truncated.iter().map(|(_, u, _)| *u).sum();
    let remainder = total_sum.saturating_sub(truncated_sum).min(truncated.len());
    // Sort in decreasing order of error
    truncated.sort_unstable_by(|a, b| b.2.total_cmp(&a.2));
    for (_, u, _) in &mut truncated[..remainder] {
        *u += 1;
    }
    truncated.sort_by_key(|(i, ..)| *i);
    truncated.iter().map(|(_, u, _)| *u).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PopulationConfig, SpeciesId};
    use std::num::NonZeroUsize;

    #[derive(Clone, Debug)]
    struct Point(f64);

    impl Genome for Point {
        fn size(&self) -> usize {
            1
        }

        fn genetic_distance(&self, other: &Point) -> f64 {
            (self.0 - other.0).abs()
        }
    }

    fn scored<G>(genome: G, score: f64) -> Arc<Individual<G>> {
        let mut individual = Individual::new(genome, 0);
        individual.set_score(score);
        individual.set_adjusted_score(score);
        Arc::new(individual)
    }

    fn config(size: usize) -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(size).unwrap(),
            stagnation_threshold: NonZeroUsize::new(3).unwrap(),
            ..PopulationConfig::default()
        }
    }

    #[test]
    fn round_retain_sum() {
        let v = [
            5.2,
            9.5,
            2.8,
            1.3,
            2.2,
            2.7,
            6.3,
            1.0000000000001,
            0.9999999999999,
        ];
        let w = super::round_retain_sum(&v);
        assert_eq!(v.iter().sum::<f64>().round() as usize, w.iter().sum::<usize>());
        assert_eq!(w, [5, 10, 3, 1, 2, 3, 6, 1, 1]);
    }

    #[test]
    fn allotment_sums_to_total() {
        let comparator = GenomeComparator::best(ScoreDirection::Maximize);
        for total in [0, 1, 7, 49, 100] {
            let mut species = vec![
                Species::new(SpeciesId(0), scored((), -3.0)),
                Species::new(SpeciesId(1), scored((), 2.0)),
                Species::new(SpeciesId(2), scored((), 0.5)),
            ];
            species[1].add(scored((), 1.0));
            allot_offspring(&mut species, total, &comparator, 15, None);
            let sum: usize = species.iter().map(|s| s.offspring_count()).sum();
            assert_eq!(sum, total);
        }
    }

    #[test]
    fn better_species_get_more_offspring() {
        let comparator = GenomeComparator::best(ScoreDirection::Minimize);
        let mut species = vec![
            Species::new(SpeciesId(0), scored((), 10.0)),
            Species::new(SpeciesId(1), scored((), 1.0)),
            Species::new(SpeciesId(2), scored((), 4.0)),
        ];
        allot_offspring(&mut species, 12, &comparator, 15, None);
        let counts: Vec<usize> = species.iter().map(|s| s.offspring_count()).collect();
        // Distances from the worst score (10.0) are 0, 9 and 6.
        assert_eq!(counts, vec![0, 7, 5]);
    }

    #[test]
    fn stagnated_species_keep_offspring_only_with_the_best() {
        let comparator = GenomeComparator::best(ScoreDirection::Maximize);
        let best = scored((), 5.0);
        let mut species = vec![
            Species::new(SpeciesId(0), scored((), 4.0)).with_bookkeeping(9, Some(4.0), 5),
            Species::new(SpeciesId(1), best.clone()).with_bookkeeping(9, Some(5.0), 5),
            Species::new(SpeciesId(2), scored((), 1.0)),
        ];
        allot_offspring(&mut species, 10, &comparator, 3, Some(&best));
        assert_eq!(species[0].offspring_count(), 0);
        assert_eq!(species[1].offspring_count(), 10);
        assert_eq!(species[2].offspring_count(), 0);
    }

    #[test]
    fn identical_scores_fall_back_to_member_counts() {
        let comparator = GenomeComparator::best(ScoreDirection::Maximize);
        let mut species = vec![
            Species::new(SpeciesId(0), scored((), 1.0)),
            Species::new(SpeciesId(1), scored((), 1.0)),
        ];
        species[0].add(scored((), f64::NEG_INFINITY));
        species[0].add(scored((), 1.0));
        allot_offspring(&mut species, 8, &comparator, 15, None);
        let counts: Vec<usize> = species.iter().map(|s| s.offspring_count()).collect();
        assert_eq!(counts, vec![6, 2]);
    }

    #[test]
    fn single_speciation_reuses_its_species() {
        let comparator = GenomeComparator::best(ScoreDirection::Maximize);
        let mut population = Population::new(config(4));
        let mut speciation = SingleSpeciation;

        let first: Vec<_> = (0..4).map(|i| scored(Point(i as f64), i as f64)).collect();
        speciation.perform_speciation(&mut population, first, &comparator);
        let second: Vec<_> = (0..4).map(|i| scored(Point(i as f64), 1.0)).collect();
        speciation.perform_speciation(&mut population, second, &comparator);

        let species: Vec<_> = population.species().collect();
        assert_eq!(species.len(), 1);
        assert_eq!(species[0].id(), SpeciesId(0));
        assert_eq!(species[0].len(), 4);
        assert_eq!(species[0].age(), 1);
        assert_eq!(species[0].best_score(), Some(3.0));
        assert_eq!(species[0].gens_no_improvement(), 1);
        assert_eq!(species[0].offspring_count(), 3);
    }

    #[test]
    fn single_speciation_merges_seeded_species() {
        let comparator = GenomeComparator::best(ScoreDirection::Maximize);
        let mut population =
            Population::from_genomes(config(3), vec![vec![Point(0.0)], vec![Point(1.0), Point(2.0)]])
                .unwrap();
        let genomes = population.take_genomes();
        SingleSpeciation.perform_speciation(&mut population, genomes, &comparator);
        assert_eq!(population.species().count(), 1);
        assert_eq!(population.len(), 3);
    }

    #[test]
    fn threshold_speciation_groups_by_distance() {
        let comparator = GenomeComparator::best(ScoreDirection::Maximize);
        let mut population = Population::new(config(6));
        let genomes: Vec<_> = [0.0, 0.2, 5.0, 5.3, 0.1, 20.0]
            .iter()
            .map(|x| scored(Point(*x), -x))
            .collect();
        let mut speciation = ThresholdSpeciation::new(1.0);
        speciation.perform_speciation(&mut population, genomes, &comparator);

        let sizes: Vec<usize> = population.species().map(|s| s.len()).collect();
        assert_eq!(sizes, vec![3, 2, 1]);
        let total: usize = population.species().map(|s| s.offspring_count()).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn threshold_moves_towards_target() {
        let comparator = GenomeComparator::best(ScoreDirection::Maximize);
        let mut population = Population::new(config(4));
        let genomes: Vec<_> = [0.0, 3.0, 6.0, 9.0]
            .iter()
            .map(|x| scored(Point(*x), 0.0))
            .collect();
        let mut speciation = ThresholdSpeciation::targeting(1.0, 2, 0.5);
        speciation.perform_speciation(&mut population, genomes, &comparator);
        assert_eq!(population.species().count(), 4);
        assert_eq!(speciation.compatibility_threshold, 1.5);

        let mut speciation = ThresholdSpeciation::targeting(1.0, 8, 0.5);
        let genomes = population.take_genomes();
        speciation.perform_speciation(&mut population, genomes, &comparator);
        assert_eq!(speciation.compatibility_threshold, 0.5);
    }
}
