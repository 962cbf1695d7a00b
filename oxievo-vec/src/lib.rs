//! # OxiEvo-Vec
//! A real-valued vector implementation of the [`OxiEvo` crate](../oxievo/index.html)'s `Genome` trait.
//!
//! Provides a [`RealVectorGenome`] type usable in `OxiEvo` `Population`s, a
//! [`RandomVectorFactory`] for generating initial populations, and the following
//! operators:
//! - [`Splice`]: two-parent crossover swapping a segment of genes.
//! - [`Perturb`]: mutation adding normally distributed noise to every gene.
//! - [`ResetGene`]: mutation redrawing a single gene uniformly.
//!
//! # Example usage: minimizing the sphere function
//! ```
//! use oxievo::{IdentityCodec, Population, PopulationConfig, ScoreAdapter, ScoreFunction, Trainer};
//! use oxievo_vec::{Perturb, RandomVectorFactory, RealVectorGenome, ResetGene, Splice};
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::num::NonZeroUsize;
//!
//! fn sphere(genome: &RealVectorGenome) -> f64 {
//!     genome.values().iter().map(|x| x * x).sum()
//! }
//!
//! let config = PopulationConfig {
//!     size: NonZeroUsize::new(40).unwrap(),
//!     ..PopulationConfig::default()
//! };
//! let factory = RandomVectorFactory::new(3, -4.0, 4.0);
//! let population = Population::initialize(config, &factory, &mut StdRng::seed_from_u64(3));
//!
//! let mut trainer = Trainer::new(population, ScoreAdapter::new(IdentityCodec, ScoreFunction::minimize(sphere)));
//! trainer.add_operation(0.5, Splice::new(1));
//! trainer.add_operation(0.4, Perturb::new(0.3));
//! trainer.add_operation(0.1, ResetGene::new(-4.0, 4.0));
//! trainer.iterations(30).unwrap();
//!
//! println!("{}", trainer.best_genome().unwrap().genome());
//! ```

mod genome;
mod operators;

pub use genome::*;
pub use operators::*;
