//! A speciated, multi-threaded evolutionary algorithm.
//!
//! Candidate solutions are arbitrary user-defined payloads implementing
//! the `Genome` trait. They are decoded into phenotypes by a `GeneticCodec`,
//! scored by a user-supplied function, grouped into species, and bred with
//! probability-weighted crossover and mutation operators. Each species
//! produces its offspring on its own worker thread, and the best individual
//! of every generation is always carried over to the next.
//!
//! A real-valued vector genome with matching operators is supplied
//! by the `oxievo-vec` crate.
//!
//! # Example usage: finding the maximum of a function of one variable
//! ```
//! use oxievo::stopping::EndScore;
//! use oxievo::{
//!     IdentityCodec, Population, PopulationConfig, ScoreAdapter, ScoreFunction, TrainConfig,
//!     Trainer,
//! };
//! use oxievo_vec::{Perturb, RandomVectorFactory, RealVectorGenome};
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::num::NonZeroUsize;
//!
//! fn evaluate(genome: &RealVectorGenome) -> f64 {
//!     -(genome.values()[0] - 5.0).abs()
//! }
//!
//! fn main() {
//!     let population_config = PopulationConfig {
//!         size: NonZeroUsize::new(50).unwrap(),
//!         ..PopulationConfig::default()
//!     };
//!     let factory = RandomVectorFactory::new(1, -10.0, 10.0);
//!     let population =
//!         Population::initialize(population_config, &factory, &mut StdRng::seed_from_u64(42));
//!
//!     let adapter = ScoreAdapter::new(IdentityCodec, ScoreFunction::maximize(evaluate));
//!     let mut trainer = Trainer::new(population, adapter).with_config(TrainConfig {
//!         seed: Some(42),
//!         ..TrainConfig::default()
//!     });
//!     trainer.add_operation(1.0, Perturb::new(1.0));
//!
//!     match trainer.train_until(&mut EndScore::new(-0.01)) {
//!         Ok(iterations) => println!(
//!             "Found {:?} after {} iterations",
//!             trainer.best_phenotype(),
//!             iterations
//!         ),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

mod codec;
mod genome;
mod operators;
mod populations;
mod score;
mod selection;
mod speciation;
pub mod stopping;
pub mod training;

pub use codec::*;
pub use genome::*;
pub use operators::*;
pub use populations::*;
pub use score::*;
pub use selection::*;
pub use speciation::*;
pub use training::{TrainConfig, TrainError, Trainer, TrainerState};

/// Error type returned by user-supplied operators
/// and score functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
