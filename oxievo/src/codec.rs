//! Translation between genomes and the
//! phenotypes a score function evaluates.

/// A directly evaluable form of a genome.
pub trait Phenotype {
    /// Resets any state left over from a previous
    /// evaluation (e.g. recurrent memory). Called
    /// before every scoring.
    fn clear_context(&mut self) {}
}

/// Decodes genomes into phenotypes and back.
pub trait GeneticCodec<G>: Send + Sync {
    type Phenotype: Phenotype;

    /// Returns the phenotype of `genome`, or `None`
    /// if the genome does not describe a valid one.
    fn decode(&self, genome: &G) -> Option<Self::Phenotype>;

    /// Returns a genome describing `phenotype`, if possible.
    fn encode(&self, phenotype: &Self::Phenotype) -> Option<G>;
}

/// Codec for encodings whose genome already is the phenotype.
///
/// # Examples
/// ```
/// use oxievo::{GeneticCodec, IdentityCodec, Phenotype};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Program(String);
/// impl Phenotype for Program {}
///
/// let program = Program("x + 1".into());
/// assert_eq!(IdentityCodec.decode(&program), Some(program.clone()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl<G> GeneticCodec<G> for IdentityCodec
where
    G: Phenotype + Clone + Send + Sync,
{
    type Phenotype = G;

    fn decode(&self, genome: &G) -> Option<G> {
        Some(genome.clone())
    }

    fn encode(&self, phenotype: &G) -> Option<G> {
        Some(phenotype.clone())
    }
}
