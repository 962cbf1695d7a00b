use oxievo::{Genome, GenomeFactory, Phenotype};

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use std::fmt;

/// A genome made of real-valued genes.
///
/// It is its own phenotype, so it can be scored
/// directly through an [`IdentityCodec`].
///
/// [`IdentityCodec`]: oxievo::IdentityCodec
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealVectorGenome {
    values: Vec<f64>,
}

impl RealVectorGenome {
    pub fn new(values: Vec<f64>) -> RealVectorGenome {
        RealVectorGenome { values }
    }

    /// Returns the genome's genes.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Genome for RealVectorGenome {
    fn size(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance between the two vectors, with
    /// missing genes of the shorter vector taken as 0.
    ///
    /// # Examples
    /// ```
    /// use oxievo::Genome;
    /// use oxievo_vec::RealVectorGenome;
    ///
    /// let a = RealVectorGenome::new(vec![0.0, 3.0]);
    /// let b = RealVectorGenome::new(vec![4.0]);
    /// assert_eq!(a.genetic_distance(&b), 5.0);
    /// ```
    fn genetic_distance(&self, other: &RealVectorGenome) -> f64 {
        let length = self.values.len().max(other.values.len());
        (0..length)
            .map(|i| {
                let a = self.values.get(i).copied().unwrap_or(0.0);
                let b = other.values.get(i).copied().unwrap_or(0.0);
                (a - b).powi(2)
            })
            .sum::<f64>()
            .sqrt()
    }
}

impl Phenotype for RealVectorGenome {}

impl fmt::Display for RealVectorGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.values
                .iter()
                .map(|v| format!("{:.4}", v))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Creates genomes of `length` genes drawn
/// uniformly from `[low, high)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomVectorFactory {
    pub length: usize,
    pub low: f64,
    pub high: f64,
}

impl RandomVectorFactory {
    pub fn new(length: usize, low: f64, high: f64) -> RandomVectorFactory {
        RandomVectorFactory { length, low, high }
    }
}

impl GenomeFactory<RealVectorGenome> for RandomVectorFactory {
    fn factor(&self, rng: &mut dyn RngCore) -> RealVectorGenome {
        RealVectorGenome::new(
            (0..self.length)
                .map(|_| uniform(rng, self.low, self.high))
                .collect(),
        )
    }
}

/// Draws from `[low, high)`, or returns `low` for an empty range.
pub(crate) fn uniform(rng: &mut dyn RngCore, low: f64, high: f64) -> f64 {
    if low < high {
        rng.gen_range(low..high)
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn factory_respects_bounds() {
        let factory = RandomVectorFactory::new(50, -2.0, 3.0);
        let genome = factory.factor(&mut StdRng::seed_from_u64(0));
        assert_eq!(genome.size(), 50);
        assert!(genome.values().iter().all(|v| (-2.0..3.0).contains(v)));
    }

    #[test]
    fn degenerate_range() {
        let factory = RandomVectorFactory::new(3, 1.0, 1.0);
        let genome = factory.factor(&mut StdRng::seed_from_u64(0));
        assert_eq!(genome.values(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn serde() {
        let genome = RealVectorGenome::new(vec![0.5, -1.25]);
        let serialized = serde_json::to_string(&genome).unwrap();
        let deserialized: RealVectorGenome = serde_json::from_str(&serialized).unwrap();
        assert_eq!(genome, deserialized);
    }

    #[test]
    fn display() {
        let genome = RealVectorGenome::new(vec![1.0, 0.5]);
        assert_eq!(genome.to_string(), "[1.0000, 0.5000]");
    }
}
