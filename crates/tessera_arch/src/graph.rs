//! Static topology of the fabric.
//!
//! Nodes and edges are stored in append-only arenas, so ids stay stable for
//! the lifetime of the graph. Forward and reverse adjacency lists are kept
//! alongside so the router can walk predecessors when it removes alternate
//! drivers of a switch output.

use crate::error::ArchError;
use crate::ids::{EdgeId, NodeId};
use crate::types::{Edge, Node, NodeKey, NodeKind};
use std::collections::HashMap;

/// The fabric as a directed graph of typed resources.
///
/// Topology is fixed after construction; only base edge weights may be
/// (re)assigned, via [`set_base_weight`](Self::set_base_weight), before the
/// graph is shared with the search.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    out_adj: Vec<Vec<EdgeId>>,
    in_adj: Vec<Vec<EdgeId>>,
    by_key: HashMap<NodeKey, NodeId>,
}

impl ResourceGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its id. Keys must be unique.
    pub fn add_node(&mut self, key: NodeKey) -> Result<NodeId, ArchError> {
        if self.by_key.contains_key(&key) {
            return Err(ArchError::DuplicateNode(key.to_string()));
        }
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(Node { id, key });
        self.out_adj.push(Vec::new());
        self.in_adj.push(Vec::new());
        self.by_key.insert(key, id);
        Ok(id)
    }

    /// Adds a directed edge with the given base weight.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, weight: f64) -> EdgeId {
        self.add_edge_across(src, dst, weight, None)
    }

    /// Adds a directed edge that crosses pipeline cut line `cut`, if any.
    pub fn add_edge_across(
        &mut self,
        src: NodeId,
        dst: NodeId,
        weight: f64,
        cut: Option<u32>,
    ) -> EdgeId {
        let id = EdgeId::from_raw(self.edges.len() as u32);
        self.edges.push(Edge {
            src,
            dst,
            weight,
            cut,
        });
        self.out_adj[src.index()].push(id);
        self.in_adj[dst.index()].push(id);
        id
    }

    /// Returns the node with the given id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns the edge with the given id.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    /// Returns the kind of a node.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind()
    }

    /// Looks a node up by key.
    pub fn node_id(&self, key: NodeKey) -> Option<NodeId> {
        self.by_key.get(&key).copied()
    }

    /// Returns the edge from `src` to `dst`, if one exists.
    pub fn find_edge(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        self.out_adj[src.index()]
            .iter()
            .copied()
            .find(|&e| self.edges[e.index()].dst == dst)
    }

    /// Edges leaving `id`, in insertion order.
    pub fn out_edges(&self, id: NodeId) -> &[EdgeId] {
        &self.out_adj[id.index()]
    }

    /// Edges entering `id`, in insertion order.
    pub fn in_edges(&self, id: NodeId) -> &[EdgeId] {
        &self.in_adj[id.index()]
    }

    /// All nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Ids of all edges.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len() as u32).map(EdgeId::from_raw)
    }

    /// Ids of all nodes of the given kind, in id order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.kind() == kind)
            .map(|n| n.id)
            .collect()
    }

    /// Replaces the base weight of an edge.
    pub fn set_base_weight(&mut self, id: EdgeId, weight: f64) {
        self.edges[id.index()].weight = weight;
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
