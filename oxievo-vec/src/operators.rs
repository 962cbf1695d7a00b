use crate::genome::{uniform, RealVectorGenome};

use oxievo::{BoxError, EvolutionaryOperator};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};

/// Two-parent crossover. A segment of up to `cut_length`
/// genes, at a random position shared by both parents,
/// is swapped between them, producing two children.
///
/// Parents of different lengths are spliced over their
/// common prefix; identical parents yield two copies.
///
/// # Examples
/// ```
/// use oxievo::EvolutionaryOperator;
/// use oxievo_vec::{RealVectorGenome, Splice};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let a = RealVectorGenome::new(vec![0.0; 4]);
/// let b = RealVectorGenome::new(vec![1.0; 4]);
/// let mut children = vec![];
/// Splice::new(2)
///     .perform_operation(&mut StdRng::seed_from_u64(0), &[&a, &b], &mut children)
///     .unwrap();
///
/// assert_eq!(children.len(), 2);
/// assert_eq!(children[0].values().iter().sum::<f64>(), 2.0);
/// assert_eq!(children[1].values().iter().sum::<f64>(), 2.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Splice {
    cut_length: usize,
}

impl Splice {
    pub fn new(cut_length: usize) -> Splice {
        Splice { cut_length }
    }
}

impl EvolutionaryOperator<RealVectorGenome> for Splice {
    fn parents_needed(&self) -> usize {
        2
    }

    fn max_offspring(&self) -> usize {
        2
    }

    fn perform_operation(
        &self,
        rng: &mut dyn RngCore,
        parents: &[&RealVectorGenome],
        children: &mut Vec<RealVectorGenome>,
    ) -> Result<(), BoxError> {
        let (mother, father) = match parents {
            [mother, father, ..] => (*mother, *father),
            _ => return Err(format!("splice needs 2 parents, got {}", parents.len()).into()),
        };
        let mut son = mother.clone();
        let mut daughter = father.clone();
        let common = mother.len().min(father.len());
        let segment = self.cut_length.min(common);
        if segment > 0 {
            let start = rng.gen_range(0..=common - segment);
            let range = start..start + segment;
            son.values_mut()[range.clone()].copy_from_slice(&father.values()[range.clone()]);
            daughter.values_mut()[range.clone()].copy_from_slice(&mother.values()[range]);
        }
        children.push(son);
        children.push(daughter);
        Ok(())
    }
}

/// Mutation adding `N(0, sigma)` noise to every gene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Perturb {
    sigma: f64,
}

impl Perturb {
    pub fn new(sigma: f64) -> Perturb {
        Perturb { sigma }
    }
}

impl EvolutionaryOperator<RealVectorGenome> for Perturb {
    fn parents_needed(&self) -> usize {
        1
    }

    fn max_offspring(&self) -> usize {
        1
    }

    fn perform_operation(
        &self,
        rng: &mut dyn RngCore,
        parents: &[&RealVectorGenome],
        children: &mut Vec<RealVectorGenome>,
    ) -> Result<(), BoxError> {
        let parent = parents.first().ok_or("perturb needs a parent")?;
        let noise = Normal::new(0.0, self.sigma)?;
        let mut child = (*parent).clone();
        for value in child.values_mut() {
            *value += noise.sample(rng);
        }
        children.push(child);
        Ok(())
    }
}

/// Mutation redrawing one random gene uniformly from `[low, high)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResetGene {
    low: f64,
    high: f64,
}

impl ResetGene {
    pub fn new(low: f64, high: f64) -> ResetGene {
        ResetGene { low, high }
    }
}

impl EvolutionaryOperator<RealVectorGenome> for ResetGene {
    fn parents_needed(&self) -> usize {
        1
    }

    fn max_offspring(&self) -> usize {
        1
    }

    fn perform_operation(
        &self,
        rng: &mut dyn RngCore,
        parents: &[&RealVectorGenome],
        children: &mut Vec<RealVectorGenome>,
    ) -> Result<(), BoxError> {
        let parent = parents.first().ok_or("reset needs a parent")?;
        let mut child = (*parent).clone();
        if !child.is_empty() {
            let gene = rng.gen_range(0..child.len());
            child.values_mut()[gene] = uniform(rng, self.low, self.high);
        }
        children.push(child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn splice_tolerates_identical_parents() {
        let parent = RealVectorGenome::new(vec![1.0, 2.0, 3.0]);
        let mut children = vec![];
        Splice::new(2)
            .perform_operation(&mut StdRng::seed_from_u64(1), &[&parent, &parent], &mut children)
            .unwrap();
        assert_eq!(children, vec![parent.clone(), parent]);
    }

    #[test]
    fn splice_uses_the_common_prefix() {
        let short = RealVectorGenome::new(vec![0.0]);
        let long = RealVectorGenome::new(vec![1.0, 1.0, 1.0]);
        let mut children = vec![];
        Splice::new(5)
            .perform_operation(&mut StdRng::seed_from_u64(2), &[&short, &long], &mut children)
            .unwrap();
        assert_eq!(children[0].values(), &[1.0]);
        assert_eq!(children[1].values(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn splice_needs_two_parents() {
        let parent = RealVectorGenome::new(vec![1.0]);
        let mut children = vec![];
        assert!(Splice::new(1)
            .perform_operation(&mut StdRng::seed_from_u64(0), &[&parent], &mut children)
            .is_err());
    }

    #[test]
    fn perturb_changes_every_gene() {
        let parent = RealVectorGenome::new(vec![0.0; 10]);
        let mut children = vec![];
        Perturb::new(1.0)
            .perform_operation(&mut StdRng::seed_from_u64(3), &[&parent], &mut children)
            .unwrap();
        assert_eq!(children.len(), 1);
        assert!(children[0].values().iter().all(|v| *v != 0.0));
        assert_eq!(parent.values(), &[0.0; 10]);
    }

    #[test]
    fn perturb_rejects_invalid_sigma() {
        let parent = RealVectorGenome::new(vec![0.0]);
        let mut children = vec![];
        assert!(Perturb::new(f64::NAN)
            .perform_operation(&mut StdRng::seed_from_u64(3), &[&parent], &mut children)
            .is_err());
        assert!(children.is_empty());
    }

    #[test]
    fn reset_changes_one_gene() {
        let parent = RealVectorGenome::new(vec![10.0; 5]);
        let mut children = vec![];
        ResetGene::new(0.0, 1.0)
            .perform_operation(&mut StdRng::seed_from_u64(4), &[&parent], &mut children)
            .unwrap();
        let changed = children[0].values().iter().filter(|v| **v != 10.0).count();
        assert_eq!(changed, 1);
    }
}
