//! The default A*-based router.

use crate::routing::astar::{find_path, Goal, Path, SearchQuery};
use crate::routing::const_assign::{assign_registers, const_demands};
use crate::routing::solver::AssignmentSolver;
use crate::routing::{set_default_weights, PhaseCost, RouteContext, Router, RouterOptions};
use std::collections::{BTreeMap, HashSet};
use tessera_arch::{Architecture, EdgeId, NodeId, NodeKind, RoutedGraph};
use tessera_dfg::OpId;

/// Routes each source as a multicast net with single-driver switch outputs.
///
/// Within one net, edges entering a switch output are shared at zero cost
/// and the switch's other drivers are removed; edges entering any other
/// node are consumed outright. When the net is finished its shared edges
/// are locked so no other source can reuse them.
#[derive(Debug)]
pub struct AStarRouter {
    options: RouterOptions,
    solver: Box<dyn AssignmentSolver>,
}

/// One multicast net to route.
struct Net<'n> {
    claimant: NodeId,
    sources: &'n [NodeId],
    targets: &'n [Option<NodeId>],
    relax: bool,
}

impl AStarRouter {
    /// Creates a router using `solver` for constant assignment.
    pub fn new(options: RouterOptions, solver: Box<dyn AssignmentSolver>) -> Self {
        Self { options, solver }
    }

    fn accept(&self, path: &Path) -> bool {
        path.cost <= self.options.alu_out_weight
    }

    /// Sets the usable outgoing edges of `node` to unit cost and returns
    /// them for [`restore`](Self::restore).
    fn relax_outputs(graph: &mut RoutedGraph<'_>, node: NodeId) -> Vec<EdgeId> {
        let edges: Vec<EdgeId> = graph
            .topology()
            .out_edges(node)
            .iter()
            .copied()
            .filter(|&e| graph.is_usable(e))
            .collect();
        for &e in &edges {
            graph.set_weight(e, 1.0);
        }
        edges
    }

    fn restore(graph: &mut RoutedGraph<'_>, edges: &[EdgeId]) {
        for &e in edges {
            graph.reset_weight(e);
        }
    }

    /// Records `path` for `claimant`. Returns `true` if an edge was newly
    /// shared, which voids the distance heuristic for later searches.
    fn commit(&self, graph: &mut RoutedGraph<'_>, path: &Path, claimant: NodeId) -> bool {
        let topo = graph.topology();
        let mut shared = false;
        for (i, &e) in path.edges.iter().enumerate() {
            if !graph.state(e).free {
                continue;
            }
            let dst = path.nodes[i + 1];
            if topo.kind(dst) == NodeKind::SwitchOutput {
                graph.mark_shared(e, claimant);
                for &alt in topo.in_edges(dst) {
                    if alt != e {
                        graph.remove_edge(alt);
                    }
                }
                shared = true;
            } else {
                graph.claim(e, claimant, self.options.penalty_cost);
            }
        }
        shared
    }

    fn route_net(&self, arch: &dyn Architecture, graph: &mut RoutedGraph<'_>, net: &Net<'_>) -> PhaseCost {
        let penalty = self.options.penalty_cost;
        let relaxed = if net.relax {
            Self::relax_outputs(graph, net.claimant)
        } else {
            Vec::new()
        };
        let mut cost = PhaseCost::default();
        let mut sharing = false;
        for target in net.targets {
            let Some(target) = *target else {
                cost.unroutable(1, penalty);
                continue;
            };
            let query = SearchQuery {
                sources: net.sources,
                owner: net.claimant,
                goal: Goal::Node(target),
                heuristic: !sharing,
                blocked_cuts: &[],
            };
            match find_path(arch, graph, &query) {
                Some(path) if self.accept(&path) => {
                    cost.path(path.cost);
                    sharing |= self.commit(graph, &path, net.claimant);
                }
                _ => cost.unroutable(1, penalty),
            }
        }
        graph.lock_shared(net.claimant, penalty);
        Self::restore(graph, &relaxed);
        cost
    }

    fn targets(ctx: &RouteContext<'_>, ops: &[OpId]) -> Vec<Option<NodeId>> {
        ops.iter()
            .map(|&op| ctx.arch.compute_node(ctx.mapping.get(op)))
            .collect()
    }
}

/// A port no path has claimed yet.
fn port_unclaimed(graph: &RoutedGraph<'_>, port: NodeId, outgoing: bool) -> bool {
    let topo = graph.topology();
    let edges = if outgoing {
        topo.out_edges(port)
    } else {
        topo.in_edges(port)
    };
    edges.iter().all(|&e| graph.state(e).claimant.is_none())
}

impl Router for AStarRouter {
    fn name(&self) -> &'static str {
        "astar"
    }

    fn options(&self) -> RouterOptions {
        self.options
    }

    fn set_default_weights(&self, arch: &mut dyn Architecture) {
        set_default_weights(arch.resource_graph_mut(), self.options.alu_out_weight);
    }

    fn comp_routing(&self, ctx: &RouteContext<'_>, graph: &mut RoutedGraph<'_>) -> PhaseCost {
        let app = ctx.app;
        let mut sources: Vec<(usize, OpId)> = app
            .op_ids()
            .map(|op| (app.fan_out(op), op))
            .filter(|&(fan_out, _)| fan_out > 0)
            .collect();
        sources.sort_unstable();

        let mut cost = PhaseCost::default();
        for (fan_out, src) in sources {
            let Some(node) = ctx.arch.compute_node(ctx.mapping.get(src)) else {
                cost.unroutable(fan_out, self.options.penalty_cost);
                continue;
            };
            let targets = Self::targets(ctx, &app.consumers(src));
            let net = Net {
                claimant: node,
                sources: &[node],
                targets: &targets,
                relax: true,
            };
            cost += self.route_net(ctx.arch, graph, &net);
        }
        cost
    }

    fn const_routing(&self, ctx: &RouteContext<'_>, graph: &mut RoutedGraph<'_>) -> PhaseCost {
        let penalty = self.options.penalty_cost;
        let demands = const_demands(ctx);
        let mut cost = PhaseCost::default();
        if demands.is_empty() {
            return cost;
        }
        let Some(assignment) = assign_registers(ctx, graph, self.solver.as_ref(), &demands, penalty)
        else {
            cost.unroutable(demands.len(), penalty);
            return cost;
        };

        let mut by_register: BTreeMap<usize, Vec<OpId>> = BTreeMap::new();
        for (demand, &r) in demands.iter().zip(&assignment) {
            by_register.entry(r).or_default().push(demand.consumer);
        }
        let registers = ctx.arch.const_registers();
        for (r, mut consumers) in by_register {
            consumers.sort_unstable();
            consumers.dedup();
            let Some(&reg) = registers.get(r) else {
                cost.unroutable(consumers.len(), penalty);
                continue;
            };
            let targets = Self::targets(ctx, &consumers);
            let net = Net {
                claimant: reg,
                sources: &[reg],
                targets: &targets,
                relax: false,
            };
            cost += self.route_net(ctx.arch, graph, &net);
        }
        cost
    }

    fn input_routing(&self, ctx: &RouteContext<'_>, graph: &mut RoutedGraph<'_>) -> PhaseCost {
        let penalty = self.options.penalty_cost;
        let mut taken: HashSet<NodeId> = HashSet::new();
        let mut cost = PhaseCost::default();
        for input in ctx.app.inputs() {
            let mut consumers: Vec<OpId> = input.consumers.iter().map(|&(op, _)| op).collect();
            consumers.sort_unstable();
            consumers.dedup();
            if consumers.is_empty() {
                continue;
            }
            let free: Vec<NodeId> = ctx
                .arch
                .input_ports()
                .iter()
                .copied()
                .filter(|&p| !taken.contains(&p) && port_unclaimed(graph, p, true))
                .collect();
            if free.is_empty() {
                cost.unroutable(consumers.len(), penalty);
                continue;
            }

            let mut chosen: Option<NodeId> = None;
            let mut sharing = false;
            for target in Self::targets(ctx, &consumers) {
                let Some(target) = target else {
                    cost.unroutable(1, penalty);
                    continue;
                };
                let pinned;
                let sources: &[NodeId] = match chosen {
                    Some(port) => {
                        pinned = [port];
                        &pinned
                    }
                    None => &free,
                };
                let query = SearchQuery {
                    sources,
                    owner: sources[0],
                    goal: Goal::Node(target),
                    heuristic: !sharing,
                    blocked_cuts: &[],
                };
                match find_path(ctx.arch, graph, &query) {
                    Some(path) if self.accept(&path) => {
                        let port = path.nodes[0];
                        chosen = Some(port);
                        taken.insert(port);
                        cost.path(path.cost);
                        sharing |= self.commit(graph, &path, port);
                    }
                    _ => cost.unroutable(1, penalty),
                }
            }
            if let Some(port) = chosen {
                graph.lock_shared(port, penalty);
            }
        }
        cost
    }

    fn output_routing(&self, ctx: &RouteContext<'_>, graph: &mut RoutedGraph<'_>) -> PhaseCost {
        let penalty = self.options.penalty_cost;
        let staged = ctx.pipeline.iter().any(|&b| b);
        let last_stage = ctx.pipeline.iter().filter(|&&b| b).count();
        let mut cost = PhaseCost::default();
        for output in ctx.app.outputs() {
            let Some(src) = ctx.arch.compute_node(ctx.mapping.get(output.producer)) else {
                cost.unroutable(1, penalty);
                continue;
            };
            if staged && ctx.arch.stage_of(src, ctx.pipeline) != last_stage {
                cost.unroutable(1, penalty);
                continue;
            }
            let ports: Vec<NodeId> = ctx
                .arch
                .output_ports()
                .iter()
                .copied()
                .filter(|&p| port_unclaimed(graph, p, false))
                .collect();
            if ports.is_empty() {
                cost.unroutable(1, penalty);
                continue;
            }
            let relaxed = Self::relax_outputs(graph, src);
            let query = SearchQuery {
                sources: &[src],
                owner: src,
                goal: Goal::AnyOf(&ports),
                heuristic: false,
                blocked_cuts: ctx.pipeline,
            };
            match find_path(ctx.arch, graph, &query) {
                Some(path) if self.accept(&path) => {
                    cost.path(path.cost);
                    self.commit(graph, &path, src);
                    graph.lock_shared(src, penalty);
                }
                _ => cost.unroutable(1, penalty),
            }
            Self::restore(graph, &relaxed);
        }
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Mapping;
    use crate::routing::BranchAndBoundSolver;
    use tessera_arch::{GraphOverlay, GridArchitecture, GridParams};
    use tessera_common::Coord;
    use tessera_dfg::{Application, ApplicationBuilder};

    fn router() -> AStarRouter {
        AStarRouter::new(
            RouterOptions::default(),
            Box::new(BranchAndBoundSolver::default()),
        )
    }

    fn arch(params: GridParams) -> GridArchitecture {
        let mut arch = GridArchitecture::mesh("m", params).unwrap();
        router().set_default_weights(&mut arch);
        arch
    }

    fn fan_out_app() -> Application {
        let mut b = ApplicationBuilder::new("fan");
        let s = b.op("s", "add").unwrap();
        let d0 = b.op("d0", "add").unwrap();
        let d1 = b.op("d1", "add").unwrap();
        b.edge(s, d0, 0).edge(s, d1, 0);
        b.build().unwrap()
    }

    fn mapping(coords: &[(u32, u32)]) -> Mapping {
        Mapping::new(coords.iter().map(|&(x, y)| Coord::new(x, y)).collect())
    }

    #[test]
    fn fan_out_shares_first_hop() {
        let arch = arch(GridParams::new(3, 1));
        let app = fan_out_app();
        // s at (0, 0), d0 at (1, 0), d1 at (2, 0): both paths leave through
        // the same east switch output.
        let m = mapping(&[(0, 0), (1, 0), (2, 0)]);
        let ctx = RouteContext {
            arch: &arch,
            app: &app,
            mapping: &m,
            pipeline: &[],
        };
        let mut overlay = GraphOverlay::new();
        let mut graph = RoutedGraph::new(arch.resource_graph(), &mut overlay);
        let charged = router().comp_routing(&ctx, &mut graph);
        // First hop costs 1, second path rides it for free and adds one switch hop.
        assert_eq!(charged, PhaseCost { cost: 2.0, unrouted: 0 });
        let src = arch.compute_node(Coord::new(0, 0)).unwrap();
        assert!(overlay.claimed_edges().all(|(_, c)| c == src));
    }

    #[test]
    fn relaxed_weights_are_restored() {
        let arch = arch(GridParams::new(2, 2));
        let app = fan_out_app();
        let m = mapping(&[(0, 0), (1, 0), (0, 1)]);
        let ctx = RouteContext {
            arch: &arch,
            app: &app,
            mapping: &m,
            pipeline: &[],
        };
        let mut overlay = GraphOverlay::new();
        let mut graph = RoutedGraph::new(arch.resource_graph(), &mut overlay);
        router().comp_routing(&ctx, &mut graph);
        let g = arch.resource_graph();
        for &e in g.out_edges(arch.compute_node(Coord::new(0, 0)).unwrap()) {
            let state = overlay.state(g, e);
            assert!(!state.free || state.weight == 1000.0);
        }
    }

    #[test]
    fn input_ports_are_shared_per_input() {
        let mut params = GridParams::new(2, 2);
        params.input_ports = 2;
        let arch = arch(params);
        let mut b = ApplicationBuilder::new("in");
        let a = b.op("a", "neg").unwrap();
        let c = b.op("c", "neg").unwrap();
        let x = b.input("x").unwrap();
        b.input_edge(x, a, 0).input_edge(x, c, 0);
        let app = b.build().unwrap();
        let m = mapping(&[(0, 0), (1, 0)]);
        let ctx = RouteContext {
            arch: &arch,
            app: &app,
            mapping: &m,
            pipeline: &[],
        };
        let mut overlay = GraphOverlay::new();
        let mut graph = RoutedGraph::new(arch.resource_graph(), &mut overlay);
        let charged = router().input_routing(&ctx, &mut graph);
        assert!(charged.is_routed());
        assert!(charged.cost < 1000.0);
        let claimants: HashSet<NodeId> = overlay.claimed_edges().map(|(_, c)| c).collect();
        assert_eq!(claimants.len(), 1);
    }

    #[test]
    fn output_outside_last_stage_fails_fast() {
        let mut params = GridParams::new(1, 3);
        params.output_ports = 1;
        params.pipeline_cuts = 2;
        let arch = arch(params);
        let mut b = ApplicationBuilder::new("out");
        let p = b.op("p", "neg").unwrap();
        b.output("y", p).unwrap();
        let app = b.build().unwrap();
        let m = mapping(&[(0, 0)]);
        // Unstaged: two switch hops down to the port below row 2.
        for (pipeline, expected) in [([false, false], 2.0), ([true, false], 1000.0)] {
            let ctx = RouteContext {
                arch: &arch,
                app: &app,
                mapping: &m,
                pipeline: &pipeline,
            };
            let mut overlay = GraphOverlay::new();
            let mut graph = RoutedGraph::new(arch.resource_graph(), &mut overlay);
            let charged = router().output_routing(&ctx, &mut graph);
            assert_eq!(charged.cost, expected);
            assert_eq!(charged.is_routed(), expected < 1000.0);
        }
    }

    #[test]
    fn constants_share_one_register() {
        let mut params = GridParams::new(2, 1);
        params.const_registers = 1;
        let arch = arch(params);
        let mut b = ApplicationBuilder::new("k");
        let a = b.op("a", "add").unwrap();
        let c = b.op("c", "add").unwrap();
        b.constant(5, a, 1).constant(5, c, 1).constant(5, c, 2);
        let app = b.build().unwrap();
        let m = mapping(&[(0, 0), (1, 0)]);
        let ctx = RouteContext {
            arch: &arch,
            app: &app,
            mapping: &m,
            pipeline: &[],
        };
        let mut overlay = GraphOverlay::new();
        let mut graph = RoutedGraph::new(arch.resource_graph(), &mut overlay);
        assert_eq!(router().const_routing(&ctx, &mut graph), PhaseCost::default());
        assert_eq!(overlay.claimed_count(), 2);
    }
}
