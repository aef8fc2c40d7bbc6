//! Per-individual mutable state layered over the shared topology.
//!
//! A [`GraphOverlay`] is sparse: an edge without an entry is in its base
//! state (base weight, free, present). Cloning an overlay is therefore cheap
//! compared to cloning the fabric, and two individuals never share one.

use crate::graph::ResourceGraph;
use crate::ids::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Routing state of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeState {
    /// Current routing cost.
    pub weight: f64,
    /// Whether the edge may still be claimed by a path.
    pub free: bool,
    /// Whether the edge has been removed (an alternate driver lost its switch).
    pub removed: bool,
    /// Whether the edge is provisionally shared by the source being routed.
    pub shared: bool,
    /// The source node whose data travels over this edge.
    pub claimant: Option<NodeId>,
}

impl EdgeState {
    fn base(weight: f64) -> Self {
        Self {
            weight,
            free: true,
            removed: false,
            shared: false,
            claimant: None,
        }
    }
}

/// Sparse edge-state overlay owned by one individual.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphOverlay {
    states: BTreeMap<EdgeId, EdgeState>,
}

impl GraphOverlay {
    /// Creates an overlay where every edge is in its base state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the effective state of `edge`.
    pub fn state(&self, topo: &ResourceGraph, edge: EdgeId) -> EdgeState {
        self.states
            .get(&edge)
            .copied()
            .unwrap_or_else(|| EdgeState::base(topo.edge(edge).weight))
    }

    /// Returns the source that claimed or shares `edge`, if any.
    pub fn claimant(&self, edge: EdgeId) -> Option<NodeId> {
        self.states.get(&edge).and_then(|s| s.claimant)
    }

    /// Iterates over consumed edges and the source that consumed each.
    pub fn claimed_edges(&self) -> impl Iterator<Item = (EdgeId, NodeId)> + '_ {
        self.states
            .iter()
            .filter(|(_, s)| !s.free)
            .filter_map(|(&e, s)| s.claimant.map(|c| (e, c)))
    }

    /// Returns the number of consumed edges.
    pub fn claimed_count(&self) -> usize {
        self.claimed_edges().count()
    }

    /// Returns the number of edges with non-base state.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if no edge deviates from its base state.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drops everything except consumed edges, leaving only the routing
    /// solution itself.
    pub fn prune(&mut self) {
        self.states.retain(|_, s| !s.free && s.claimant.is_some());
    }
}

/// A mutable routing view: the shared topology plus one individual's overlay.
pub struct RoutedGraph<'a> {
    topo: &'a ResourceGraph,
    overlay: &'a mut GraphOverlay,
}

impl<'a> RoutedGraph<'a> {
    /// Pairs a topology with an overlay.
    pub fn new(topo: &'a ResourceGraph, overlay: &'a mut GraphOverlay) -> Self {
        Self { topo, overlay }
    }

    /// The underlying static topology.
    pub fn topology(&self) -> &'a ResourceGraph {
        self.topo
    }

    /// Read access to the overlay.
    pub fn overlay(&self) -> &GraphOverlay {
        &*self.overlay
    }

    /// Effective state of `edge`.
    pub fn state(&self, edge: EdgeId) -> EdgeState {
        self.overlay.state(self.topo, edge)
    }

    /// Effective weight of `edge`.
    pub fn weight(&self, edge: EdgeId) -> f64 {
        self.state(edge).weight
    }

    /// Whether `edge` is present and unclaimed.
    pub fn is_usable(&self, edge: EdgeId) -> bool {
        let s = self.state(edge);
        s.free && !s.removed
    }

    /// Whether `edge` has been removed.
    pub fn is_removed(&self, edge: EdgeId) -> bool {
        self.state(edge).removed
    }

    fn entry(&mut self, edge: EdgeId) -> &mut EdgeState {
        let base = self.topo.edge(edge).weight;
        self.overlay
            .states
            .entry(edge)
            .or_insert_with(|| EdgeState::base(base))
    }

    /// Overrides the weight of `edge`.
    pub fn set_weight(&mut self, edge: EdgeId, weight: f64) {
        self.entry(edge).weight = weight;
    }

    /// Restores the base weight of `edge` if it is still free.
    pub fn reset_weight(&mut self, edge: EdgeId) {
        let base = self.topo.edge(edge).weight;
        if let Some(state) = self.overlay.states.get_mut(&edge) {
            if state.free && !state.shared {
                state.weight = base;
            }
        }
    }

    /// Marks `edge` as shared by `claimant` at zero cost.
    pub fn mark_shared(&mut self, edge: EdgeId, claimant: NodeId) {
        let state = self.entry(edge);
        state.weight = 0.0;
        state.shared = true;
        state.claimant = Some(claimant);
    }

    /// Consumes `edge` for `claimant`, blocking every other path.
    pub fn claim(&mut self, edge: EdgeId, claimant: NodeId, weight: f64) {
        let state = self.entry(edge);
        state.weight = weight;
        state.free = false;
        state.shared = false;
        state.claimant = Some(claimant);
    }

    /// Structurally removes `edge` from this individual's view.
    pub fn remove_edge(&mut self, edge: EdgeId) {
        self.entry(edge).removed = true;
    }

    /// Converts every edge shared by `claimant` into a consumed edge.
    /// Returns the number of edges locked.
    pub fn lock_shared(&mut self, claimant: NodeId, weight: f64) -> usize {
        let mut locked = 0;
        for state in self.overlay.states.values_mut() {
            if state.shared && state.claimant == Some(claimant) {
                state.shared = false;
                state.free = false;
                state.weight = weight;
                locked += 1;
            }
        }
        locked
    }
}
