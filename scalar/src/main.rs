use oxievo::logging::{EvolutionLogger, ReportingLevel};
use oxievo::stopping::{EndIterations, EndScore, StoppingStrategy};
use oxievo::{
    IdentityCodec, Population, PopulationConfig, ScoreAdapter, ScoreFunction, TrainConfig, Trainer,
};
use oxievo_vec::{Perturb, RandomVectorFactory, RealVectorGenome};

use log::info;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use std::error::Error;
use std::num::NonZeroUsize;

const TARGET: f64 = 5.0;

/// Run parameters, optionally read from a RON file
/// given as the first argument.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct RunConfig {
    population: PopulationConfig,
    training: TrainConfig,
    generations: usize,
    target_error: f64,
    sigma: f64,
}

impl Default for RunConfig {
    fn default() -> RunConfig {
        RunConfig {
            population: PopulationConfig {
                size: NonZeroUsize::new(50).unwrap(),
                ..PopulationConfig::default()
            },
            training: TrainConfig::default(),
            generations: 200,
            target_error: 0.001,
            sigma: 1.0,
        }
    }
}

fn evaluate(genome: &RealVectorGenome) -> f64 {
    -(genome.values()[0] - TARGET).abs()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config: RunConfig = match std::env::args().nth(1) {
        Some(path) => ron::from_str(&std::fs::read_to_string(path)?)?,
        None => RunConfig::default(),
    };
    info!("running with {:?}", config);

    let mut rng = match config.training.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let factory = RandomVectorFactory::new(1, -10.0, 10.0);
    let population = Population::initialize(config.population.clone(), &factory, &mut rng);

    let adapter = ScoreAdapter::new(IdentityCodec, ScoreFunction::maximize(evaluate));
    let mut trainer = Trainer::new(population, adapter).with_config(config.training.clone());
    trainer.add_operation(1.0, Perturb::new(config.sigma));

    let mut stopping: Vec<Box<dyn StoppingStrategy>> = vec![
        Box::new(EndIterations::new(config.generations)),
        Box::new(EndScore::new(-config.target_error)),
    ];
    let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);
    let comparator = trainer.adapter().best_comparator();
    loop {
        trainer.iteration()?;
        logger.log_scores(trainer.iteration_number(), trainer.population(), &comparator);
        if stopping.should_stop(
            trainer.iteration_number(),
            trainer.error(),
            trainer.adapter().direction(),
        ) {
            break;
        }
    }
    trainer.finish_training();

    if let Some(log) = logger.iter().last() {
        println!("{}", log);
    }
    match trainer.best_genome() {
        Some(champion) => println!(
            "Champion after {} generations: {}",
            trainer.iteration_number(),
            ron::to_string(&**champion)?
        ),
        None => eprintln!("no champion"),
    }
    Ok(())
}
