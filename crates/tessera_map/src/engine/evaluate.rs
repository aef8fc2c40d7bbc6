//! Phase planning and the routing failure policy.

use crate::routing::{Phase, RouteContext, Router, RouterOptions};
use std::fmt;
use tessera_arch::{Architecture, GraphOverlay, RoutedGraph};
use tessera_config::FailureMultipliers;
use tessera_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tessera_dfg::Application;

/// Application reads inputs but the fabric has no input ports.
pub const MISSING_INPUT_PORTS: DiagnosticCode = DiagnosticCode::new(Category::Compat, 101);
/// Application drives outputs but the fabric has no output ports.
pub const MISSING_OUTPUT_PORTS: DiagnosticCode = DiagnosticCode::new(Category::Compat, 102);
/// Application uses constants but the fabric has no constant registers.
pub const MISSING_CONST_REGISTERS: DiagnosticCode = DiagnosticCode::new(Category::Compat, 103);
/// More application ports than fabric ports.
pub const PORT_SHORTAGE: DiagnosticCode = DiagnosticCode::new(Category::Compat, 104);

/// The routing phases a run requires, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasePlan {
    phases: Vec<Phase>,
}

impl PhasePlan {
    /// Runs every phase.
    pub fn all() -> Self {
        Self {
            phases: Phase::ALL.to_vec(),
        }
    }

    /// Runs exactly `phases`, reordered into execution order.
    pub fn of(phases: &[Phase]) -> Self {
        let mut phases = phases.to_vec();
        phases.sort_unstable();
        phases.dedup();
        Self { phases }
    }

    /// Decides which phases the fabric and application need, reporting
    /// mismatches to `sink`.
    ///
    /// Computation routing always runs. Constant routing runs when the
    /// fabric routes constants explicitly and the application has any.
    /// Port phases run when both sides have ports; an application needing
    /// ports the fabric lacks is a warning and the phase is skipped.
    pub fn required(arch: &dyn Architecture, app: &Application, sink: &DiagnosticSink) -> Self {
        let mut phases = vec![Phase::Comp];

        if arch.needs_const_routing() && app.uses_constants() {
            if arch.const_registers().is_empty() {
                sink.emit(
                    Diagnostic::warning(
                        MISSING_CONST_REGISTERS,
                        format!(
                            "application `{}` uses {} constant value(s) but the fabric has no constant registers",
                            app.name(),
                            app.distinct_constants().len()
                        ),
                    )
                    .with_note("every mapping will fail constant routing"),
                );
            }
            phases.push(Phase::Const);
        }

        let used_inputs = app.inputs().iter().filter(|p| !p.consumers.is_empty()).count();
        if app.uses_inputs() {
            let ports = arch.input_ports().len();
            if ports == 0 {
                sink.emit(Diagnostic::warning(
                    MISSING_INPUT_PORTS,
                    format!("application reads {used_inputs} input(s) but the fabric has no input ports"),
                ));
            } else {
                if used_inputs > ports {
                    sink.emit(Diagnostic::warning(
                        PORT_SHORTAGE,
                        format!("application reads {used_inputs} inputs but the fabric has {ports} input ports"),
                    ));
                }
                phases.push(Phase::Input);
            }
        }

        if app.uses_outputs() {
            let ports = arch.output_ports().len();
            let outputs = app.outputs().len();
            if ports == 0 {
                sink.emit(Diagnostic::warning(
                    MISSING_OUTPUT_PORTS,
                    format!("application drives {outputs} output(s) but the fabric has no output ports"),
                ));
            } else {
                if outputs > ports {
                    sink.emit(Diagnostic::warning(
                        PORT_SHORTAGE,
                        format!("application drives {outputs} outputs but the fabric has {ports} output ports"),
                    ));
                }
                phases.push(Phase::Output);
            }
        }
        Self { phases }
    }

    /// Phases in execution order.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Whether `phase` runs.
    pub fn contains(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }
}

impl fmt::Display for PhasePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.phases.iter().map(Phase::to_string).collect();
        f.write_str(&names.join(" -> "))
    }
}

/// Result of routing one mapping.
#[derive(Debug, Clone)]
pub struct RoutingOutcome {
    /// The overlay after routing, pruned to the consumed edges.
    pub overlay: GraphOverlay,
    /// Accumulated cost, inflated when a phase failed.
    pub cost: f64,
    /// Whether every connection was routed within the penalty ceiling.
    pub valid: bool,
    /// The phase that failed, if any.
    pub failed: Option<Phase>,
}

/// Cost multiplier for an individual whose routing failed in `phase`.
pub fn failure_multiplier(multipliers: &FailureMultipliers, phase: Phase) -> f64 {
    match phase {
        Phase::Comp => multipliers.comp,
        Phase::Const => multipliers.konst,
        Phase::Input => multipliers.input,
        Phase::Output => multipliers.output,
    }
}

/// Upper bound on the routing cost of a fully routed mapping of `app`.
///
/// Every accepted path costs at most `alu_out_weight`, and a mapping routes
/// at most one path per dependency, constant, input consumer and output.
pub fn route_bound(app: &Application, options: &RouterOptions) -> f64 {
    let inputs: usize = app.inputs().iter().map(|p| p.consumers.len()).sum();
    let connections = app.comp_edges().len() + app.const_edges().len() + inputs + app.outputs().len();
    let bound = connections as f64 * options.alu_out_weight;
    options.penalty_ceiling.map_or(bound, |c| bound.min(c))
}

/// Routes a mapping on a fresh overlay, phase by phase.
///
/// A phase fails when it leaves a connection unrouted or when the
/// accumulated cost exceeds the router's penalty ceiling. The cost is then
/// multiplied by the failing phase's multiplier, the remaining phases are
/// skipped and the outcome is invalid.
pub fn route_mapping(
    router: &dyn Router,
    ctx: &RouteContext<'_>,
    plan: &PhasePlan,
    multipliers: &FailureMultipliers,
) -> RoutingOutcome {
    let ceiling = router.options().penalty_ceiling;
    let mut overlay = GraphOverlay::new();
    let mut cost = 0.0;
    let mut failed = None;
    {
        let mut graph = RoutedGraph::new(ctx.arch.resource_graph(), &mut overlay);
        for &phase in plan.phases() {
            let charged = router.route_phase(phase, ctx, &mut graph);
            cost += charged.cost;
            if !charged.is_routed() || ceiling.is_some_and(|c| cost > c) {
                cost *= failure_multiplier(multipliers, phase);
                failed = Some(phase);
                break;
            }
        }
    }
    overlay.prune();
    RoutingOutcome {
        overlay,
        cost,
        valid: failed.is_none(),
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_arch::{GridArchitecture, GridParams};
    use tessera_dfg::ApplicationBuilder;

    fn app_with_everything() -> Application {
        let mut b = ApplicationBuilder::new("io");
        let a = b.op("a", "add").unwrap();
        b.constant(1, a, 1);
        let x = b.input("x").unwrap();
        b.input_edge(x, a, 0);
        b.output("y", a).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn plan_skips_missing_ports_with_warnings() {
        let arch = GridArchitecture::mesh("bare", GridParams::new(2, 2)).unwrap();
        let sink = DiagnosticSink::new();
        let plan = PhasePlan::required(&arch, &app_with_everything(), &sink);
        assert_eq!(plan.phases(), &[Phase::Comp, Phase::Const]);
        let codes: Vec<DiagnosticCode> = sink.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![MISSING_CONST_REGISTERS, MISSING_INPUT_PORTS, MISSING_OUTPUT_PORTS]
        );
        assert!(!sink.has_errors());
    }

    #[test]
    fn plan_full_fabric() {
        let mut params = GridParams::new(2, 2);
        params.const_registers = 1;
        params.input_ports = 1;
        params.output_ports = 1;
        let arch = GridArchitecture::mesh("full", params).unwrap();
        let sink = DiagnosticSink::new();
        let plan = PhasePlan::required(&arch, &app_with_everything(), &sink);
        assert_eq!(plan, PhasePlan::all());
        assert!(sink.diagnostics().is_empty());
        assert_eq!(plan.to_string(), "comp -> const -> input -> output");
    }

    #[test]
    fn plan_without_const_routing() {
        let mut params = GridParams::new(2, 2);
        params.const_routing = false;
        let arch = GridArchitecture::mesh("nc", params).unwrap();
        let sink = DiagnosticSink::new();
        let plan = PhasePlan::required(&arch, &app_with_everything(), &sink);
        assert!(!plan.contains(Phase::Const));
    }

    #[test]
    fn route_bound_counts_every_connection() {
        let app = app_with_everything();
        // One constant, one input use and one output.
        let options = RouterOptions::default();
        assert_eq!(route_bound(&app, &options), 3.0 * options.alu_out_weight);
        let capped = RouterOptions {
            penalty_ceiling: Some(500.0),
            ..options
        };
        assert_eq!(route_bound(&app, &capped), 500.0);
    }

    #[test]
    fn multipliers_by_phase() {
        let m = FailureMultipliers::default();
        assert_eq!(failure_multiplier(&m, Phase::Comp), 40.0);
        assert_eq!(failure_multiplier(&m, Phase::Output), 10.0);
        assert_eq!(PhasePlan::of(&[Phase::Output, Phase::Comp]).phases(), &[Phase::Comp, Phase::Output]);
    }
}
