use super::{Population, SpeciesId};

use crate::genome::{Genome, Individual};
use crate::score::GenomeComparator;

use std::fmt;

/// Defines different possible reporting levels for logging.
#[derive(Clone, Copy, Debug)]
pub enum ReportingLevel {
    /// Clones the entire population.
    AllGenomes,
    /// Clones species and their champions.
    SpeciesChampions,
    /// Clones only the population champion.
    PopulationChampion,
    /// Clones no genomes.
    NoGenomes,
}

/// A snapshot of a population.
#[derive(Clone, Debug)]
pub struct Log<G> {
    pub generation_number: usize,
    pub generation_sample: GenerationMemberRecord<G>,
    pub species_count: usize,
    pub genome_stats: Vec<(String, Stats)>,
}

impl<G> fmt::Display for Log<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Log {{\n\
            \tgeneration_number: {:?}\n\
            \tspecies_count: {:?}\n\
            {}\
            }}",
            &self.generation_number,
            &self.species_count,
            self.genome_stats
                .iter()
                .map(|(name, stats)| format!("\t{}: {:?}\n", name, stats))
                .collect::<Vec<_>>()
                .join("")
        )
    }
}

/// Basic statistics over the finite values of a sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub maximum: f64,
    pub minimum: f64,
    pub mean: f64,
    pub median: f64,
    /// Number of non-finite values left out.
    pub non_finite: usize,
}

impl Stats {
    /// Returns statistics about numbers in a sequence.
    /// Infinite and NaN values (failed decodes, unscored
    /// individuals) are counted but otherwise ignored.
    ///
    /// # Examples
    /// ```
    /// use oxievo::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5, f64::NEG_INFINITY].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// assert_eq!(stats.non_finite, 1);
    /// ```
    pub fn from(data: impl Iterator<Item = f64>) -> Stats {
        let (mut data, non_finite): (Vec<f64>, Vec<f64>) = data.partition(|d| d.is_finite());
        if data.is_empty() {
            return Stats {
                maximum: f64::NAN,
                minimum: f64::NAN,
                mean: f64::NAN,
                median: f64::NAN,
                non_finite: non_finite.len(),
            };
        }
        data.sort_by(|a, b| a.total_cmp(b));
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f64>() / data.len() as f64,
            median,
            non_finite: non_finite.len(),
        }
    }
}

/// A reporting-level dependant store
/// of individuals from a population.
#[derive(Clone, Debug)]
pub enum GenerationMemberRecord<G> {
    /// Species IDs, members and stagnation level.
    Species(Vec<(SpeciesId, Vec<Individual<G>>, usize)>),
    /// Only species IDs, species champions, and stagnation level.
    SpeciesChampions(Vec<(SpeciesId, Individual<G>, usize)>),
    /// Only population champion.
    PopulationChampion(Individual<G>),
    /// Empty.
    None,
}

/// A log of the evolution of a population over time.
#[derive(Clone, Debug)]
pub struct EvolutionLogger<G> {
    reporting_level: ReportingLevel,
    logs: Vec<Log<G>>,
}

impl<G: Clone> EvolutionLogger<G> {
    /// Returns a logger with the appropiate reporting level.
    ///
    /// # Examples
    /// ```
    /// use oxievo::logging::{EvolutionLogger, ReportingLevel};
    /// use oxievo_vec::RealVectorGenome;
    ///
    /// let logger = EvolutionLogger::<RealVectorGenome>::new(ReportingLevel::NoGenomes);
    /// assert_eq!(logger.iter().count(), 0);
    /// ```
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger<G> {
        EvolutionLogger {
            reporting_level,
            logs: vec![],
        }
    }

    /// Store a snapshot of a population.
    ///
    /// The `stat_extractor` provides a way of obtaining
    /// arbitrary statistics on the population's individuals,
    /// where each statistic is named by `stat_names`.
    /// [`EvolutionLogger::log_scores`] covers the usual case.
    pub fn log<SE, const N: usize>(
        &mut self,
        generation: usize,
        population: &Population<G>,
        comparator: &GenomeComparator,
        stat_extractor: &SE,
        stat_names: [&str; N],
    ) where
        SE: Fn(&Individual<G>) -> [f64; N],
    {
        let stats: Vec<[f64; N]> = population
            .genomes()
            .map(|individual| stat_extractor(&**individual))
            .collect();
        let stats = stat_names
            .iter()
            .cloned()
            .map(String::from)
            .zip(unzip_n_vecs(stats.into_iter()))
            .map(|(name, data)| (name, Stats::from(data.into_iter())))
            .collect();
        self.logs.push(Log {
            generation_number: generation,
            generation_sample: match self.reporting_level {
                ReportingLevel::AllGenomes => GenerationMemberRecord::Species(
                    population
                        .species()
                        .map(|s| {
                            (
                                s.id(),
                                s.members().iter().map(|m| (**m).clone()).collect(),
                                s.gens_no_improvement(),
                            )
                        })
                        .collect(),
                ),
                ReportingLevel::SpeciesChampions => GenerationMemberRecord::SpeciesChampions(
                    population
                        .species()
                        .filter_map(|s| {
                            s.champion(comparator)
                                .map(|c| (s.id(), (**c).clone(), s.gens_no_improvement()))
                        })
                        .collect(),
                ),
                ReportingLevel::PopulationChampion => match population.best() {
                    Some(best) => GenerationMemberRecord::PopulationChampion((**best).clone()),
                    None => GenerationMemberRecord::None,
                },
                ReportingLevel::NoGenomes => GenerationMemberRecord::None,
            },
            species_count: population.species().filter(|s| !s.is_empty()).count(),
            genome_stats: stats,
        })
    }

    /// Iterate over all logged snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Log<G>> {
        self.logs.iter()
    }
}

impl<G: Genome> EvolutionLogger<G> {
    /// Stores a snapshot with score, adjusted score,
    /// age and genome size statistics.
    pub fn log_scores(
        &mut self,
        generation: usize,
        population: &Population<G>,
        comparator: &GenomeComparator,
    ) {
        self.log(
            generation,
            population,
            comparator,
            &|i: &Individual<G>| {
                [
                    i.score(),
                    i.adjusted_score(),
                    i.age(generation) as f64,
                    i.size() as f64,
                ]
            },
            ["score", "adjusted_score", "age", "size"],
        )
    }
}

fn unzip_n_vecs<T: Clone, const N: usize>(iter: impl Iterator<Item = [T; N]>) -> Vec<Vec<T>> {
    let mut vecs = vec![Vec::default(); N];
    for items in iter {
        for (vec, item) in vecs.iter_mut().zip(items) {
            vec.push(item);
        }
    }
    vecs
}
