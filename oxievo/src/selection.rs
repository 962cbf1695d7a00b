use crate::populations::Species;
use crate::score::GenomeComparator;

use rand::{Rng, RngCore};

/// Chooses members of a species for reproduction.
pub trait SelectionOperator<G>: Send + Sync {
    /// Returns the index of the selected member, or `None`
    /// if the species is empty.
    fn perform_selection(
        &self,
        rng: &mut dyn RngCore,
        species: &Species<G>,
        comparator: &GenomeComparator,
    ) -> Option<usize>;

    /// Returns the index of a poorly performing member, or
    /// `None` if the species is empty.
    ///
    /// The generational trainer never calls this. It is for
    /// replacement strategies that pick a member to overwrite,
    /// such as steady-state training loops built on this crate.
    fn perform_anti_selection(
        &self,
        rng: &mut dyn RngCore,
        species: &Species<G>,
        comparator: &GenomeComparator,
    ) -> Option<usize>;
}

/// Tournament selection: the best of `rounds` uniformly
/// drawn members wins. Larger tournaments mean stronger
/// selective pressure.
#[derive(Debug, Clone, Copy)]
pub struct TournamentSelection {
    rounds: usize,
}

impl Default for TournamentSelection {
    fn default() -> TournamentSelection {
        TournamentSelection::new(4)
    }
}

impl TournamentSelection {
    /// Creates a tournament of `rounds` draws (at least one).
    pub fn new(rounds: usize) -> TournamentSelection {
        TournamentSelection {
            rounds: rounds.max(1),
        }
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    fn tournament<G>(
        &self,
        rng: &mut dyn RngCore,
        species: &Species<G>,
        keep: impl Fn(usize, usize) -> bool,
    ) -> Option<usize> {
        if species.is_empty() {
            return None;
        }
        let mut winner = rng.gen_range(0..species.len());
        for _ in 1..self.rounds {
            let challenger = rng.gen_range(0..species.len());
            if keep(challenger, winner) {
                winner = challenger;
            }
        }
        Some(winner)
    }
}

impl<G: Send + Sync> SelectionOperator<G> for TournamentSelection {
    fn perform_selection(
        &self,
        rng: &mut dyn RngCore,
        species: &Species<G>,
        comparator: &GenomeComparator,
    ) -> Option<usize> {
        let members = species.members();
        self.tournament(rng, species, |challenger, winner| {
            comparator.is_better_than(&members[challenger], &members[winner])
        })
    }

    fn perform_anti_selection(
        &self,
        rng: &mut dyn RngCore,
        species: &Species<G>,
        comparator: &GenomeComparator,
    ) -> Option<usize> {
        let members = species.members();
        self.tournament(rng, species, |challenger, winner| {
            comparator.is_better_than(&members[winner], &members[challenger])
        })
    }
}
