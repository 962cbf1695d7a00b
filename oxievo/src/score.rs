//! Scoring of individuals: the user objective, score
//! comparison, and the adjuster chain that turns raw
//! scores into adjusted ones.
use crate::codec::{GeneticCodec, Phenotype};
use crate::genome::{Genome, Individual};
use crate::training::TrainError;
use crate::BoxError;

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::marker::PhantomData;

/// Whether lower or higher scores are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreDirection {
    Minimize,
    Maximize,
}

impl ScoreDirection {
    /// Returns the direction matching a
    /// [`CalculateScore::should_minimize`] flag.
    pub fn from_minimize(should_minimize: bool) -> ScoreDirection {
        if should_minimize {
            ScoreDirection::Minimize
        } else {
            ScoreDirection::Maximize
        }
    }

    /// The worst possible score: `+inf` when
    /// minimizing, `-inf` when maximizing.
    pub fn worst_score(self) -> f64 {
        match self {
            ScoreDirection::Minimize => f64::INFINITY,
            ScoreDirection::Maximize => f64::NEG_INFINITY,
        }
    }

    /// Converts a non-negative amount into a
    /// score delta that makes a score worse.
    ///
    /// # Examples
    /// ```
    /// use oxievo::ScoreDirection;
    ///
    /// assert_eq!(ScoreDirection::Minimize.worsen(2.0), 2.0);
    /// assert_eq!(ScoreDirection::Maximize.worsen(2.0), -2.0);
    /// ```
    pub fn worsen(self, amount: f64) -> f64 {
        match self {
            ScoreDirection::Minimize => amount,
            ScoreDirection::Maximize => -amount,
        }
    }

    /// Returns whether `a` is strictly better than `b`.
    /// NaN is worse than every number.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match (a.is_nan(), b.is_nan()) {
            (true, _) => false,
            (false, true) => true,
            (false, false) => match self {
                ScoreDirection::Minimize => a < b,
                ScoreDirection::Maximize => a > b,
            },
        }
    }
}

/// Which of an individual's scores a comparator looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreKind {
    Raw,
    Adjusted,
}

/// Compares individuals by score under a [`ScoreDirection`].
///
/// The _best_ comparator ranks raw scores and tracks the
/// champion; the _selection_ comparator ranks adjusted
/// scores and drives parent selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenomeComparator {
    direction: ScoreDirection,
    kind: ScoreKind,
}

impl GenomeComparator {
    /// A comparator over raw scores.
    pub fn best(direction: ScoreDirection) -> GenomeComparator {
        GenomeComparator {
            direction,
            kind: ScoreKind::Raw,
        }
    }

    /// A comparator over adjusted scores.
    pub fn selection(direction: ScoreDirection) -> GenomeComparator {
        GenomeComparator {
            direction,
            kind: ScoreKind::Adjusted,
        }
    }

    pub fn direction(&self) -> ScoreDirection {
        self.direction
    }

    /// Returns the score this comparator ranks by.
    pub fn score_of<G>(&self, individual: &Individual<G>) -> f64 {
        match self.kind {
            ScoreKind::Raw => individual.score(),
            ScoreKind::Adjusted => individual.adjusted_score(),
        }
    }

    /// Returns whether `a` is strictly better than `b`.
    ///
    /// # Examples
    /// ```
    /// use oxievo::{GenomeComparator, Individual, ScoreDirection};
    ///
    /// let mut a = Individual::new((), 0);
    /// let mut b = Individual::new((), 0);
    /// a.set_score(1.0);
    /// b.set_score(2.0);
    ///
    /// let minimize = GenomeComparator::best(ScoreDirection::Minimize);
    /// assert!(minimize.is_better_than(&a, &b));
    /// let maximize = GenomeComparator::best(ScoreDirection::Maximize);
    /// assert!(maximize.is_better_than(&b, &a));
    /// ```
    pub fn is_better_than<G>(&self, a: &Individual<G>, b: &Individual<G>) -> bool {
        self.is_score_better(self.score_of(a), self.score_of(b))
    }

    pub fn is_score_better(&self, a: f64, b: f64) -> bool {
        self.direction.is_better(a, b)
    }

    /// Orders better individuals first, for best-first sorting.
    pub fn compare<G>(&self, a: &Individual<G>, b: &Individual<G>) -> Ordering {
        if self.is_better_than(a, b) {
            Ordering::Less
        } else if self.is_better_than(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    pub fn worst_score(&self) -> f64 {
        self.direction.worst_score()
    }
}

/// A user objective evaluated on phenotypes.
pub trait CalculateScore<P>: Send + Sync {
    /// Scores a phenotype.
    fn calculate_score(&self, phenotype: &P) -> Result<f64, BoxError>;

    /// Whether lower scores are better.
    fn should_minimize(&self) -> bool;

    /// Whether the objective must only ever run on
    /// one thread. Training falls back to a single
    /// thread if so.
    fn require_single_threaded(&self) -> bool {
        false
    }
}

/// Values a scoring closure may return.
pub trait IntoScore {
    fn into_score(self) -> Result<f64, BoxError>;
}

impl IntoScore for f64 {
    fn into_score(self) -> Result<f64, BoxError> {
        Ok(self)
    }
}

impl<E: Into<BoxError>> IntoScore for Result<f64, E> {
    fn into_score(self) -> Result<f64, BoxError> {
        self.map_err(Into::into)
    }
}

/// Adapts a closure into a [`CalculateScore`].
///
/// The closure may return either an `f64` or a
/// `Result<f64, E>` for fallible objectives.
///
/// # Examples
/// ```
/// use oxievo::{CalculateScore, ScoreFunction};
///
/// let objective = ScoreFunction::maximize(|x: &f64| -(x - 5.0).abs());
/// assert!(!CalculateScore::<f64>::should_minimize(&objective));
/// assert_eq!(objective.calculate_score(&3.0).unwrap(), -2.0);
///
/// let strict = ScoreFunction::minimize(|x: &f64| {
///     if x.is_sign_negative() {
///         Err("negative input")
///     } else {
///         Ok(x.sqrt())
///     }
/// })
/// .single_threaded();
/// assert!(CalculateScore::<f64>::require_single_threaded(&strict));
/// assert!(strict.calculate_score(&-1.0).is_err());
/// ```
pub struct ScoreFunction<F, R = f64> {
    function: F,
    direction: ScoreDirection,
    single_threaded: bool,
    _output: PhantomData<fn() -> R>,
}

impl<F, R> ScoreFunction<F, R> {
    /// Wraps an objective where higher scores are better.
    pub fn maximize<P>(function: F) -> ScoreFunction<F, R>
    where
        F: Fn(&P) -> R,
    {
        ScoreFunction::with_direction(function, ScoreDirection::Maximize)
    }

    /// Wraps an objective where lower scores are better.
    pub fn minimize<P>(function: F) -> ScoreFunction<F, R>
    where
        F: Fn(&P) -> R,
    {
        ScoreFunction::with_direction(function, ScoreDirection::Minimize)
    }

    fn with_direction(function: F, direction: ScoreDirection) -> ScoreFunction<F, R> {
        ScoreFunction {
            function,
            direction,
            single_threaded: false,
            _output: PhantomData,
        }
    }

    /// Marks the objective as unsafe to call concurrently.
    pub fn single_threaded(mut self) -> ScoreFunction<F, R> {
        self.single_threaded = true;
        self
    }
}

impl<P, F, R> CalculateScore<P> for ScoreFunction<F, R>
where
    F: Fn(&P) -> R + Send + Sync,
    R: IntoScore,
{
    fn calculate_score(&self, phenotype: &P) -> Result<f64, BoxError> {
        (self.function)(phenotype).into_score()
    }

    fn should_minimize(&self) -> bool {
        self.direction == ScoreDirection::Minimize
    }

    fn require_single_threaded(&self) -> bool {
        self.single_threaded
    }
}

/// A link of the score adjustment chain.
///
/// Adjustments of every link are summed and
/// added to the raw score.
pub trait AdjustScore<G>: Send + Sync {
    fn calculate_adjustment(
        &self,
        individual: &Individual<G>,
        generation: usize,
        direction: ScoreDirection,
    ) -> f64;
}

/// Penalizes genomes larger than `threshold`.
///
/// The penalty, a fraction of the raw score's magnitude,
/// ramps linearly from `penalty` just above `threshold`
/// to `full_penalty` at `full_threshold` and beyond.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityPenalty {
    pub threshold: usize,
    pub full_threshold: usize,
    pub penalty: f64,
    pub full_penalty: f64,
}

impl Default for ComplexityPenalty {
    fn default() -> ComplexityPenalty {
        ComplexityPenalty {
            threshold: 10,
            full_threshold: 50,
            penalty: 0.2,
            full_penalty: 2.0,
        }
    }
}

impl ComplexityPenalty {
    /// Returns the penalty fraction for a genome of `size`.
    fn fraction(&self, size: usize) -> f64 {
        if size <= self.threshold {
            0.0
        } else if size >= self.full_threshold {
            self.full_penalty
        } else {
            let range = (self.full_threshold - self.threshold) as f64;
            let over = (size - self.threshold) as f64;
            self.penalty + (self.full_penalty - self.penalty) * over / range
        }
    }
}

impl<G: Genome> AdjustScore<G> for ComplexityPenalty {
    fn calculate_adjustment(
        &self,
        individual: &Individual<G>,
        _generation: usize,
        direction: ScoreDirection,
    ) -> f64 {
        direction.worsen(individual.score().abs() * self.fraction(individual.size()))
    }
}

/// Favors young individuals and penalizes old ones,
/// both as fractions of the raw score's magnitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeAdjustment {
    /// Individuals younger than this get the bonus.
    pub young_threshold: usize,
    pub young_bonus: f64,
    /// Individuals older than this get the penalty.
    pub old_threshold: usize,
    pub old_penalty: f64,
}

impl<G> AdjustScore<G> for AgeAdjustment {
    fn calculate_adjustment(
        &self,
        individual: &Individual<G>,
        generation: usize,
        direction: ScoreDirection,
    ) -> f64 {
        let age = individual.age(generation);
        let magnitude = individual.score().abs();
        if age < self.young_threshold {
            -direction.worsen(magnitude * self.young_bonus)
        } else if age > self.old_threshold {
            direction.worsen(magnitude * self.old_penalty)
        } else {
            0.0
        }
    }
}

/// Scores individuals: decodes them, evaluates the
/// phenotype and applies the adjuster chain.
///
/// Shared by reference between training workers;
/// every collaborator is `Send + Sync`.
pub struct ScoreAdapter<G, P> {
    codec: Box<dyn GeneticCodec<G, Phenotype = P>>,
    score_function: Box<dyn CalculateScore<P>>,
    adjusters: Vec<Box<dyn AdjustScore<G>>>,
    direction: ScoreDirection,
}

impl<G, P: Phenotype> ScoreAdapter<G, P> {
    pub fn new<C, S>(codec: C, score_function: S) -> ScoreAdapter<G, P>
    where
        C: GeneticCodec<G, Phenotype = P> + 'static,
        S: CalculateScore<P> + 'static,
    {
        let direction = ScoreDirection::from_minimize(score_function.should_minimize());
        ScoreAdapter {
            codec: Box::new(codec),
            score_function: Box::new(score_function),
            adjusters: vec![],
            direction,
        }
    }

    /// Appends an adjuster to the chain.
    pub fn add_adjuster<A: AdjustScore<G> + 'static>(&mut self, adjuster: A) {
        self.adjusters.push(Box::new(adjuster));
    }

    pub fn direction(&self) -> ScoreDirection {
        self.direction
    }

    pub fn require_single_threaded(&self) -> bool {
        self.score_function.require_single_threaded()
    }

    pub fn best_comparator(&self) -> GenomeComparator {
        GenomeComparator::best(self.direction)
    }

    pub fn selection_comparator(&self) -> GenomeComparator {
        GenomeComparator::selection(self.direction)
    }

    pub fn decode(&self, genome: &G) -> Option<P> {
        self.codec.decode(genome)
    }

    /// Sets the raw and adjusted scores of `individual`.
    ///
    /// Genomes that decode to no phenotype get the worst
    /// possible score instead of an error.
    ///
    /// # Errors
    /// Returns an error if the score function fails.
    pub fn calculate_score(
        &self,
        individual: &mut Individual<G>,
        generation: usize,
    ) -> Result<(), TrainError> {
        let mut phenotype = match self.codec.decode(individual.genome()) {
            Some(phenotype) => phenotype,
            None => {
                let worst = self.direction.worst_score();
                individual.set_score(worst);
                individual.set_adjusted_score(worst);
                return Ok(());
            }
        };
        phenotype.clear_context();
        let score = self
            .score_function
            .calculate_score(&phenotype)
            .map_err(TrainError::Scoring)?;
        individual.set_score(score);
        self.calculate_adjustment(individual, generation);
        Ok(())
    }

    /// Recomputes the adjusted score from the raw score.
    pub fn calculate_adjustment(&self, individual: &mut Individual<G>, generation: usize) {
        let score = individual.score();
        if !score.is_finite() {
            individual.set_adjusted_score(score);
            return;
        }
        let delta: f64 = self
            .adjusters
            .iter()
            .map(|a| a.calculate_adjustment(individual, generation, self.direction))
            .sum();
        individual.set_adjusted_score(score + delta);
    }
}
