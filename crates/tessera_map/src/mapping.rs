//! Operation-to-coordinate assignments.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tessera_common::Coord;
use tessera_dfg::OpId;

/// The coordinate of every operation, indexed by [`OpId`].
///
/// A valid mapping is injective; operators that may break this report it
/// through [`is_injective`](Self::is_injective) and callers repair it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mapping(Vec<Coord>);

impl Mapping {
    /// Wraps a coordinate per operation.
    pub fn new(coords: Vec<Coord>) -> Self {
        Self(coords)
    }

    /// Number of mapped operations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for an empty mapping.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The coordinate of `op`.
    pub fn get(&self, op: OpId) -> Coord {
        self.0[op.index()]
    }

    /// Moves `op` to `coord`.
    pub fn set(&mut self, op: OpId, coord: Coord) {
        self.0[op.index()] = coord;
    }

    /// Coordinates in operation order.
    pub fn coords(&self) -> &[Coord] {
        &self.0
    }

    pub(crate) fn coords_mut(&mut self) -> &mut [Coord] {
        &mut self.0
    }

    /// The operation placed at `coord`, if any.
    pub fn op_at(&self, coord: Coord) -> Option<OpId> {
        self.0
            .iter()
            .position(|&c| c == coord)
            .map(|i| OpId::from_raw(i as u32))
    }

    /// Set of occupied coordinates.
    pub fn occupied(&self) -> HashSet<Coord> {
        self.0.iter().copied().collect()
    }

    /// Whether no two operations share a coordinate.
    pub fn is_injective(&self) -> bool {
        self.occupied().len() == self.0.len()
    }

    /// Columns spanned by the mapping.
    pub fn width_span(&self) -> u32 {
        span(self.0.iter().map(|c| c.x))
    }

    /// Rows spanned by the mapping.
    pub fn height_span(&self) -> u32 {
        span(self.0.iter().map(|c| c.y))
    }
}

fn span(values: impl Iterator<Item = u32>) -> u32 {
    let (lo, hi) = values.fold((u32::MAX, 0), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        0
    } else {
        hi - lo + 1
    }
}

/// Drops repeated mappings, keeping first occurrences in order.
pub fn dedup_mappings(mappings: Vec<Mapping>) -> Vec<Mapping> {
    let mut seen = HashSet::new();
    mappings
        .into_iter()
        .filter(|m| seen.insert(m.clone()))
        .collect()
}
