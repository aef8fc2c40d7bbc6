//! The persistent Pareto archive.

use crate::engine::nsga2::dominates;
use crate::individual::Individual;

/// Non-dominated individuals seen so far.
///
/// Fitness vectors are compared after multiplying by `signs` (`1.0` for
/// minimised objectives, `-1.0` for maximised), so domination is always
/// "smaller is better".
#[derive(Debug, Clone)]
pub struct ParetoArchive {
    signs: Vec<f64>,
    members: Vec<Individual>,
}

impl ParetoArchive {
    /// Creates an empty archive.
    pub fn new(signs: Vec<f64>) -> Self {
        Self {
            signs,
            members: Vec::new(),
        }
    }

    /// Offers candidates; returns how many were inserted.
    ///
    /// A candidate is rejected if a member dominates it or already has the
    /// same fitness or the same mapping; members it dominates are evicted.
    pub fn update<'a>(&mut self, candidates: impl IntoIterator<Item = &'a Individual>) -> usize {
        let mut inserted = 0;
        for cand in candidates {
            if !cand.is_evaluated() {
                continue;
            }
            let signs = &self.signs;
            let c = oriented(signs, cand);
            let rejected = self.members.iter().any(|m| {
                let o = oriented(signs, m);
                dominates(&o, &c) || o == c || m.mapping() == cand.mapping()
            });
            if rejected {
                continue;
            }
            self.members.retain(|m| !dominates(&c, &oriented(signs, m)));
            self.members.push(cand.clone());
            inserted += 1;
        }
        inserted
    }

    /// Sorted fitness vectors of the members; equal between generations
    /// exactly when the archive's fitness set did not change.
    pub fn fitness_set(&self) -> Vec<Vec<f64>> {
        let mut set: Vec<Vec<f64>> = self.members.iter().map(|m| m.fitness().to_vec()).collect();
        set.sort_by(|a, b| {
            a.iter()
                .zip(b)
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        set
    }

    /// Current members.
    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the archive is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Consumes the archive, keeping valid members only.
    pub fn into_valid(self) -> Vec<Individual> {
        self.members.into_iter().filter(Individual::is_valid).collect()
    }
}

fn oriented(signs: &[f64], ind: &Individual) -> Vec<f64> {
    ind.fitness().iter().zip(signs).map(|(f, s)| f * s).collect()
}
