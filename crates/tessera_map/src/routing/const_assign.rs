//! Builds and solves the constant-register assignment for one mapping.

use crate::routing::astar::{find_path, Goal, SearchQuery};
use crate::routing::solver::{AssignmentProblem, AssignmentSolver, SolverOutcome};
use crate::routing::RouteContext;
use tessera_arch::RoutedGraph;
use tessera_dfg::OpId;
use tracing::trace;

/// A constant value needed by one consumer; repeated operand slots of the
/// same value collapse into one demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ConstDemand {
    pub value: i64,
    pub consumer: OpId,
}

/// Distinct `(value, consumer)` pairs in a stable order.
pub(crate) fn const_demands(ctx: &RouteContext<'_>) -> Vec<ConstDemand> {
    let mut demands: Vec<ConstDemand> = ctx
        .app
        .const_edges()
        .iter()
        .map(|c| ConstDemand {
            value: c.value,
            consumer: c.consumer,
        })
        .collect();
    demands.sort_unstable();
    demands.dedup();
    demands
}

/// Chooses a register index for every demand, or `None` when the
/// assignment is infeasible, non-optimal, or reaches `penalty` in total.
///
/// The register-count check runs before any distance is computed.
pub(crate) fn assign_registers(
    ctx: &RouteContext<'_>,
    graph: &RoutedGraph<'_>,
    solver: &dyn AssignmentSolver,
    demands: &[ConstDemand],
    penalty: f64,
) -> Option<Vec<usize>> {
    let mut distinct: Vec<i64> = demands.iter().map(|d| d.value).collect();
    distinct.dedup();
    let registers = ctx.arch.const_registers();
    if distinct.len() > registers.len() {
        trace!(
            values = distinct.len(),
            registers = registers.len(),
            "more constant values than registers"
        );
        return None;
    }

    let costs = demands
        .iter()
        .map(|d| {
            let target = ctx.arch.compute_node(ctx.mapping.get(d.consumer));
            registers
                .iter()
                .map(|&reg| {
                    let Some(target) = target else { return penalty };
                    let query = SearchQuery {
                        sources: &[reg],
                        owner: reg,
                        goal: Goal::Node(target),
                        heuristic: true,
                        blocked_cuts: &[],
                    };
                    find_path(ctx.arch, graph, &query).map_or(penalty, |p| p.cost)
                })
                .collect()
        })
        .collect();
    let values = demands
        .iter()
        .map(|d| distinct.iter().position(|&v| v == d.value).unwrap_or(0))
        .collect();
    let problem = AssignmentProblem {
        value_count: distinct.len(),
        registers: registers.len(),
        values,
        costs,
    };
    match solver.solve(&problem) {
        SolverOutcome::Optimal { cost, assignment } if cost < penalty => Some(assignment),
        outcome => {
            trace!(?outcome, "constant assignment rejected");
            None
        }
    }
}
