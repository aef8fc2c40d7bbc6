//! Objective functions and their registry.

use crate::individual::Individual;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use tessera_arch::{Architecture, NodeKind};
use tessera_dfg::Application;

/// Read-only inputs every objective receives.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// Target fabric.
    pub arch: &'a dyn Architecture,
    /// Application being mapped.
    pub app: &'a Application,
    /// Free-form simulation parameters from the run configuration.
    pub sim: &'a BTreeMap<String, f64>,
    /// Cost charged per unroutable connection.
    pub penalty: f64,
    /// Largest routing cost a fully routed mapping of `app` can have.
    pub route_bound: f64,
}

/// One entry of the fitness vector.
///
/// `evaluate` runs after routing. It may cache auxiliary values on the
/// individual and may mark it invalid. Once an individual is invalid the
/// engine reports [`invalid_score`](Objective::invalid_score) for every
/// objective instead, so an invalid individual never dominates a valid one.
pub trait Objective: Send + Sync + Debug {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Whether smaller values are better.
    fn is_minimize(&self) -> bool;

    /// Scores an individual.
    fn evaluate(&self, ctx: &EvalContext<'_>, individual: &mut Individual) -> f64;

    /// The worst score a valid individual can reach in `ctx`.
    fn worst_valid(&self, ctx: &EvalContext<'_>) -> f64;

    /// Score of an invalid individual: past [`worst_valid`](Self::worst_valid)
    /// by its routing cost, and by at least one penalty.
    fn invalid_score(&self, ctx: &EvalContext<'_>, individual: &Individual) -> f64 {
        let excess = individual.routing_cost().max(ctx.penalty);
        if self.is_minimize() {
            self.worst_valid(ctx) + excess
        } else {
            self.worst_valid(ctx) - excess
        }
    }
}

/// Total routing cost, penalties included.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireLength;

impl Objective for WireLength {
    fn name(&self) -> &'static str {
        "wire_length"
    }

    fn is_minimize(&self) -> bool {
        true
    }

    fn evaluate(&self, _ctx: &EvalContext<'_>, individual: &mut Individual) -> f64 {
        individual.routing_cost()
    }

    fn worst_valid(&self, ctx: &EvalContext<'_>) -> f64 {
        ctx.route_bound
    }
}

/// Columns spanned by the mapping. Exceeding `sim.width_limit` makes the
/// individual invalid.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapWidth;

impl Objective for MapWidth {
    fn name(&self) -> &'static str {
        "map_width"
    }

    fn is_minimize(&self) -> bool {
        true
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, individual: &mut Individual) -> f64 {
        let width = f64::from(individual.mapping().width_span());
        if let Some(&limit) = ctx.sim.get("width_limit") {
            if width > limit {
                individual.mark_invalid();
            }
        }
        width
    }

    fn worst_valid(&self, ctx: &EvalContext<'_>) -> f64 {
        f64::from(ctx.arch.dimensions().0)
    }
}

/// Area of the mapping's bounding box.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapArea;

impl Objective for MapArea {
    fn name(&self) -> &'static str {
        "map_area"
    }

    fn is_minimize(&self) -> bool {
        true
    }

    fn evaluate(&self, _ctx: &EvalContext<'_>, individual: &mut Individual) -> f64 {
        let m = individual.mapping();
        f64::from(m.width_span()) * f64::from(m.height_span())
    }

    fn worst_valid(&self, ctx: &EvalContext<'_>) -> f64 {
        let (width, height) = ctx.arch.dimensions();
        f64::from(width) * f64::from(height)
    }
}

/// Switch outputs carrying a routed signal; cached as `switch_usage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchUsage;

impl Objective for SwitchUsage {
    fn name(&self) -> &'static str {
        "switch_usage"
    }

    fn is_minimize(&self) -> bool {
        true
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, individual: &mut Individual) -> f64 {
        let topo = ctx.arch.resource_graph();
        let used = individual.routed().map_or(0, |overlay| {
            overlay
                .claimed_edges()
                .map(|(e, _)| topo.edge(e).dst)
                .filter(|&n| topo.kind(n) == NodeKind::SwitchOutput)
                .collect::<HashSet<_>>()
                .len()
        });
        let value = used as f64;
        individual.cache("switch_usage", value);
        value
    }

    fn worst_valid(&self, ctx: &EvalContext<'_>) -> f64 {
        ctx.arch
            .resource_graph()
            .nodes_of_kind(NodeKind::SwitchOutput)
            .len() as f64
    }
}

/// Registered objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    /// [`WireLength`].
    WireLength,
    /// [`MapWidth`].
    MapWidth,
    /// [`MapArea`].
    MapArea,
    /// [`SwitchUsage`].
    SwitchUsage,
}

impl ObjectiveKind {
    /// Every registered objective.
    pub const ALL: [ObjectiveKind; 4] = [
        ObjectiveKind::WireLength,
        ObjectiveKind::MapWidth,
        ObjectiveKind::MapArea,
        ObjectiveKind::SwitchUsage,
    ];

    /// Resolves a configured objective name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.build().name() == name)
    }

    /// Instantiates the objective.
    pub fn build(self) -> Box<dyn Objective> {
        match self {
            ObjectiveKind::WireLength => Box::new(WireLength),
            ObjectiveKind::MapWidth => Box::new(MapWidth),
            ObjectiveKind::MapArea => Box::new(MapArea),
            ObjectiveKind::SwitchUsage => Box::new(SwitchUsage),
        }
    }
}
