//! A* search over an individual's routing view.
//!
//! Edge costs come from the overlay. An edge is traversable when it is
//! present and free, or when it was already consumed by the same claimant
//! the search routes for (a wire that already carries the signal costs
//! nothing to reuse).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tessera_arch::{Architecture, EdgeId, NodeId, RoutedGraph};

/// What a search is looking for.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Goal<'s> {
    /// One specific node; admits a distance heuristic.
    Node(NodeId),
    /// Any node of the set.
    AnyOf(&'s [NodeId]),
}

impl Goal<'_> {
    fn reached(&self, node: NodeId) -> bool {
        match self {
            Goal::Node(target) => *target == node,
            Goal::AnyOf(targets) => targets.contains(&node),
        }
    }
}

/// Parameters of one search.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchQuery<'s> {
    /// Start nodes, all at cost 0.
    pub sources: &'s [NodeId],
    /// The claimant whose consumed edges may be reused.
    pub owner: NodeId,
    /// Search target.
    pub goal: Goal<'s>,
    /// Whether to use the architecture's hop bound. Only admissible while
    /// no zero-cost shared edges exist for `owner`.
    pub heuristic: bool,
    /// Active pipeline cuts; edges crossing them are not traversable.
    pub blocked_cuts: &'s [bool],
}

/// A found route.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Path {
    /// Nodes from source to target.
    pub nodes: Vec<NodeId>,
    /// Edges between consecutive nodes.
    pub edges: Vec<EdgeId>,
    /// Sum of traversal costs.
    pub cost: f64,
}

#[derive(Debug, Clone, Copy)]
struct State {
    node: NodeId,
    cost: f64,
    estimate: f64,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on (estimate, node id).
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cost of traversing `edge` for `owner`, or `None` if it is unavailable.
pub(crate) fn traversal_cost(graph: &RoutedGraph<'_>, edge: EdgeId, owner: NodeId) -> Option<f64> {
    let state = graph.state(edge);
    if state.removed {
        None
    } else if state.free {
        Some(state.weight)
    } else if state.claimant == Some(owner) {
        Some(0.0)
    } else {
        None
    }
}

/// Finds the cheapest path described by `query`, or `None` if the goal is
/// unreachable.
pub(crate) fn find_path(
    arch: &dyn Architecture,
    graph: &RoutedGraph<'_>,
    query: &SearchQuery<'_>,
) -> Option<Path> {
    let topo = graph.topology();
    let h = |node: NodeId| match query.goal {
        Goal::Node(target) if query.heuristic => arch.hop_lower_bound(node, target),
        _ => 0.0,
    };

    let mut open = BinaryHeap::new();
    let mut g_scores: HashMap<NodeId, f64> = HashMap::new();
    let mut came_from: HashMap<NodeId, (NodeId, EdgeId)> = HashMap::new();

    for &s in query.sources {
        g_scores.insert(s, 0.0);
        open.push(State {
            node: s,
            cost: 0.0,
            estimate: h(s),
        });
    }

    while let Some(current) = open.pop() {
        let best = g_scores.get(&current.node).copied().unwrap_or(f64::INFINITY);
        if current.cost > best {
            continue;
        }
        if query.goal.reached(current.node) {
            return Some(reconstruct(&came_from, current.node, current.cost));
        }
        for &e in topo.out_edges(current.node) {
            let edge = topo.edge(e);
            if let Some(k) = edge.cut {
                if query.blocked_cuts.get(k as usize).copied().unwrap_or(false) {
                    continue;
                }
            }
            let Some(step) = traversal_cost(graph, e, query.owner) else {
                continue;
            };
            let tentative = current.cost + step;
            if tentative < g_scores.get(&edge.dst).copied().unwrap_or(f64::INFINITY) {
                g_scores.insert(edge.dst, tentative);
                came_from.insert(edge.dst, (current.node, e));
                open.push(State {
                    node: edge.dst,
                    cost: tentative,
                    estimate: tentative + h(edge.dst),
                });
            }
        }
    }
    None
}

fn reconstruct(came_from: &HashMap<NodeId, (NodeId, EdgeId)>, end: NodeId, cost: f64) -> Path {
    let mut nodes = vec![end];
    let mut edges = Vec::new();
    let mut current = end;
    while let Some(&(prev, e)) = came_from.get(&current) {
        nodes.push(prev);
        edges.push(e);
        current = prev;
    }
    nodes.reverse();
    edges.reverse();
    Path { nodes, edges, cost }
}
