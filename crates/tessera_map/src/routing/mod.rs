//! The routing feasibility oracle.
//!
//! A [`Router`] turns a mapping into routed paths over an individual's
//! [`RoutedGraph`] and reports a [`PhaseCost`] per phase. Infeasibility never
//! aborts: every unroutable connection adds [`RouterOptions::penalty_cost`]
//! and is counted, and the phase continues, so the caller can compare
//! infeasible candidates numerically.

mod astar;
mod const_assign;
mod router;
mod solver;

pub use router::AStarRouter;
pub use solver::{AssignmentProblem, AssignmentSolver, BranchAndBoundSolver, SolverKind, SolverOutcome};

use crate::mapping::Mapping;
use std::fmt;
use std::ops::AddAssign;
use tessera_arch::{Architecture, NodeKind, ResourceGraph, RoutedGraph};
use tessera_config::RouterConfig;
use tessera_dfg::Application;

/// A routing phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Operation-to-operation dependencies.
    Comp,
    /// Constant register to consuming operation.
    Const,
    /// Input port to consuming operation.
    Input,
    /// Producing operation to output port.
    Output,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 4] = [Phase::Comp, Phase::Const, Phase::Input, Phase::Output];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Comp => "comp",
            Phase::Const => "const",
            Phase::Input => "input",
            Phase::Output => "output",
        };
        f.write_str(name)
    }
}

/// What one routing phase charged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseCost {
    /// Path costs plus penalties.
    pub cost: f64,
    /// Connections left unrouted.
    pub unrouted: usize,
}

impl PhaseCost {
    /// Adds the cost of a committed path.
    pub fn path(&mut self, cost: f64) {
        self.cost += cost;
    }

    /// Charges `penalty` for each of `connections` unroutable connections.
    pub fn unroutable(&mut self, connections: usize, penalty: f64) {
        self.unrouted += connections;
        self.cost += penalty * connections as f64;
    }

    /// Whether every connection of the phase was routed.
    pub fn is_routed(&self) -> bool {
        self.unrouted == 0
    }
}

impl AddAssign for PhaseCost {
    fn add_assign(&mut self, other: Self) {
        self.cost += other.cost;
        self.unrouted += other.unrouted;
    }
}

/// Cost settings shared by all routers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterOptions {
    /// Cost added for each connection that cannot be routed.
    pub penalty_cost: f64,
    /// Accumulated cost above which a fully routed mapping still fails.
    pub penalty_ceiling: Option<f64>,
    /// Base cost of a compute unit's outgoing edges; a path costing more than
    /// this used a compute unit as a wire and counts as unroutable.
    pub alu_out_weight: f64,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            penalty_cost: 1000.0,
            penalty_ceiling: None,
            alu_out_weight: 1000.0,
        }
    }
}

impl From<&RouterConfig> for RouterOptions {
    fn from(config: &RouterConfig) -> Self {
        Self {
            penalty_cost: config.penalty_cost,
            penalty_ceiling: config.penalty_ceiling,
            alu_out_weight: config.alu_out_weight,
        }
    }
}

/// Everything a phase reads besides the routing graph.
#[derive(Clone, Copy)]
pub struct RouteContext<'a> {
    /// Target fabric.
    pub arch: &'a dyn Architecture,
    /// Application being mapped.
    pub app: &'a Application,
    /// Current placement.
    pub mapping: &'a Mapping,
    /// Active pipeline cuts.
    pub pipeline: &'a [bool],
}

/// A routing strategy. Implementations must charge
/// [`RouterOptions::penalty_cost`] per unroutable connection, count it in
/// [`PhaseCost::unrouted`] and keep routing the rest of the phase.
pub trait Router: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Cost settings in use.
    fn options(&self) -> RouterOptions;

    /// Assigns the fabric's base edge costs.
    fn set_default_weights(&self, arch: &mut dyn Architecture);

    /// Routes operation-to-operation dependencies.
    fn comp_routing(&self, ctx: &RouteContext<'_>, graph: &mut RoutedGraph<'_>) -> PhaseCost;

    /// Assigns constant registers and routes constants.
    fn const_routing(&self, ctx: &RouteContext<'_>, graph: &mut RoutedGraph<'_>) -> PhaseCost;

    /// Routes application inputs from input ports.
    fn input_routing(&self, ctx: &RouteContext<'_>, graph: &mut RoutedGraph<'_>) -> PhaseCost;

    /// Routes application outputs to output ports.
    fn output_routing(&self, ctx: &RouteContext<'_>, graph: &mut RoutedGraph<'_>) -> PhaseCost;

    /// Runs one phase by tag.
    fn route_phase(&self, phase: Phase, ctx: &RouteContext<'_>, graph: &mut RoutedGraph<'_>) -> PhaseCost {
        match phase {
            Phase::Comp => self.comp_routing(ctx, graph),
            Phase::Const => self.const_routing(ctx, graph),
            Phase::Input => self.input_routing(ctx, graph),
            Phase::Output => self.output_routing(ctx, graph),
        }
    }
}

/// Registered router implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterKind {
    /// [`AStarRouter`].
    AStar,
}

impl RouterKind {
    /// Resolves a configured router name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "astar" => Some(RouterKind::AStar),
            _ => None,
        }
    }

    /// Instantiates the router.
    pub fn build(self, options: RouterOptions, solver: Box<dyn AssignmentSolver>) -> Box<dyn Router> {
        match self {
            RouterKind::AStar => Box::new(AStarRouter::new(options, solver)),
        }
    }
}

/// Assigns base costs: a compute unit's outgoing edges cost
/// `alu_out_weight`, hops into a switch output cost 1, and hops into or out
/// of constant registers and ports cost 0.
pub fn set_default_weights(graph: &mut ResourceGraph, alu_out_weight: f64) {
    let ids: Vec<_> = graph.edge_ids().collect();
    for e in ids {
        let edge = graph.edge(e);
        let weight = match (graph.kind(edge.src), graph.kind(edge.dst)) {
            (NodeKind::Compute, _) => alu_out_weight,
            (NodeKind::ConstReg | NodeKind::InPort, _) => 0.0,
            (_, NodeKind::SwitchOutput) => 1.0,
            _ => 0.0,
        };
        graph.set_base_weight(e, weight);
    }
}
