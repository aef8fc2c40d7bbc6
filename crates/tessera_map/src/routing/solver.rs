//! The constant-register assignment port and its exact solver.
//!
//! The problem is the integer program
//!
//! ```text
//! minimise    sum_e sum_r cost[e][r] * x[e][r]
//! subject to  sum_r x[e][r] = 1                      for every edge e
//!             y[r][v] >= x[e][r]                     for every edge e of value v
//!             sum_v y[r][v] <= 1                     for every register r
//!             x, y binary
//! ```
//!
//! i.e. every register holds at most one constant value, and edges carrying
//! the same value may share registers freely.

use std::fmt::Debug;

/// One constant-assignment instance.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentProblem {
    /// Number of distinct constant values.
    pub value_count: usize,
    /// Number of constant registers.
    pub registers: usize,
    /// Value class (`0..value_count`) of each edge.
    pub values: Vec<usize>,
    /// `costs[edge][register]`: routing distance from the register to the
    /// edge's consumer.
    pub costs: Vec<Vec<f64>>,
}

/// Solver result.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverOutcome {
    /// Proven optimum: total cost and the register chosen for each edge.
    Optimal {
        /// Objective value.
        cost: f64,
        /// Register index per edge.
        assignment: Vec<usize>,
    },
    /// No assignment satisfies the constraints.
    Infeasible,
    /// The search budget ran out before optimality was proven.
    NodeLimit,
}

/// A constant-assignment backend. Calls are independent and may run
/// concurrently from several evaluation workers.
pub trait AssignmentSolver: Send + Sync + Debug {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Solves one instance.
    fn solve(&self, problem: &AssignmentProblem) -> SolverOutcome;
}

/// Registered solver backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// [`BranchAndBoundSolver`].
    BranchAndBound,
}

impl SolverKind {
    /// Resolves a configured solver name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "branch_and_bound" | "bnb" => Some(SolverKind::BranchAndBound),
            _ => None,
        }
    }

    /// Instantiates the solver.
    pub fn build(self, node_limit: u64) -> Box<dyn AssignmentSolver> {
        match self {
            SolverKind::BranchAndBound => Box::new(BranchAndBoundSolver::new(node_limit)),
        }
    }
}

/// Exact depth-first branch and bound over register ownership.
///
/// Registers are decided one at a time (owned by one value, or left
/// unused). The bound charges each edge its cheapest register among those
/// already owned by its value and those still undecided.
#[derive(Debug, Clone, Copy)]
pub struct BranchAndBoundSolver {
    node_limit: u64,
}

impl BranchAndBoundSolver {
    /// Creates a solver that gives up after `node_limit` search nodes.
    pub fn new(node_limit: u64) -> Self {
        Self { node_limit }
    }
}

impl Default for BranchAndBoundSolver {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

struct Search<'p> {
    problem: &'p AssignmentProblem,
    owner: Vec<Option<usize>>,
    best_cost: f64,
    best_owner: Option<Vec<Option<usize>>>,
    nodes: u64,
    limit: u64,
    exhausted: bool,
}

impl Search<'_> {
    /// Lower bound with registers `decided..` still open.
    fn bound(&self, decided: usize) -> f64 {
        let p = self.problem;
        let mut total = 0.0;
        for (e, &v) in p.values.iter().enumerate() {
            let best = (0..p.registers)
                .filter(|&r| r >= decided || self.owner[r] == Some(v))
                .map(|r| p.costs[e][r])
                .fold(f64::INFINITY, f64::min);
            total += best;
        }
        total
    }

    fn unowned_values(&self, decided: usize) -> usize {
        (0..self.problem.value_count)
            .filter(|v| !self.owner[..decided].contains(&Some(*v)))
            .count()
    }

    fn branch(&mut self, r: usize) {
        if self.exhausted {
            return;
        }
        self.nodes += 1;
        if self.nodes > self.limit {
            self.exhausted = true;
            return;
        }
        let p = self.problem;
        if self.unowned_values(r) > p.registers - r {
            return;
        }
        let bound = self.bound(r);
        if !bound.is_finite() || bound >= self.best_cost {
            return;
        }
        if r == p.registers {
            self.best_cost = bound;
            self.best_owner = Some(self.owner.clone());
            return;
        }
        let mut choices: Vec<(f64, usize)> = (0..p.value_count)
            .map(|v| {
                let c: f64 = p
                    .values
                    .iter()
                    .enumerate()
                    .filter(|&(_, &ev)| ev == v)
                    .map(|(e, _)| p.costs[e][r])
                    .sum();
                (c, v)
            })
            .collect();
        choices.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for (_, v) in choices {
            self.owner[r] = Some(v);
            self.branch(r + 1);
        }
        self.owner[r] = None;
        self.branch(r + 1);
    }
}

impl AssignmentSolver for BranchAndBoundSolver {
    fn name(&self) -> &'static str {
        "branch_and_bound"
    }

    fn solve(&self, problem: &AssignmentProblem) -> SolverOutcome {
        if problem.values.is_empty() {
            return SolverOutcome::Optimal {
                cost: 0.0,
                assignment: Vec::new(),
            };
        }
        if problem.value_count > problem.registers {
            return SolverOutcome::Infeasible;
        }
        let mut search = Search {
            problem,
            owner: vec![None; problem.registers],
            best_cost: f64::INFINITY,
            best_owner: None,
            nodes: 0,
            limit: self.node_limit,
            exhausted: false,
        };
        search.branch(0);
        if search.exhausted {
            return SolverOutcome::NodeLimit;
        }
        let Some(owner) = search.best_owner else {
            return SolverOutcome::Infeasible;
        };
        let assignment = problem
            .values
            .iter()
            .enumerate()
            .map(|(e, &v)| {
                (0..problem.registers)
                    .filter(|&r| owner[r] == Some(v))
                    .min_by(|&a, &b| problem.costs[e][a].total_cmp(&problem.costs[e][b]).then(a.cmp(&b)))
                    .unwrap_or(0)
            })
            .collect();
        SolverOutcome::Optimal {
            cost: search.best_cost,
            assignment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(values: Vec<usize>, value_count: usize, costs: Vec<Vec<f64>>) -> AssignmentProblem {
        let registers = costs.first().map_or(0, Vec::len);
        AssignmentProblem {
            value_count,
            registers,
            values,
            costs,
        }
    }

    #[test]
    fn same_value_shares_register() {
        let p = problem(vec![0, 0], 1, vec![vec![1.0, 5.0], vec![1.0, 5.0]]);
        let out = BranchAndBoundSolver::default().solve(&p);
        assert_eq!(
            out,
            SolverOutcome::Optimal {
                cost: 2.0,
                assignment: vec![0, 0]
            }
        );
    }

    #[test]
    fn distinct_values_need_distinct_registers() {
        // Both prefer register 0; the cheaper total gives it to value 1.
        let p = problem(vec![0, 1], 2, vec![vec![1.0, 2.0], vec![1.0, 9.0]]);
        match BranchAndBoundSolver::default().solve(&p) {
            SolverOutcome::Optimal { cost, assignment } => {
                assert_eq!(cost, 3.0);
                assert_eq!(assignment, vec![1, 0]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn value_may_use_several_registers() {
        let p = problem(vec![0, 0], 1, vec![vec![1.0, 4.0], vec![4.0, 1.0]]);
        match BranchAndBoundSolver::default().solve(&p) {
            SolverOutcome::Optimal { cost, assignment } => {
                assert_eq!(cost, 2.0);
                assert_eq!(assignment, vec![0, 1]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn too_many_values_is_infeasible() {
        let p = problem(
            vec![0, 1, 2],
            3,
            vec![vec![0.0, 0.0], vec![0.0, 0.0], vec![0.0, 0.0]],
        );
        assert_eq!(BranchAndBoundSolver::default().solve(&p), SolverOutcome::Infeasible);
    }

    #[test]
    fn unreachable_registers_are_infeasible() {
        let p = problem(vec![0], 1, vec![vec![f64::INFINITY]]);
        assert_eq!(BranchAndBoundSolver::default().solve(&p), SolverOutcome::Infeasible);
    }

    #[test]
    fn node_limit_reported() {
        let costs = vec![vec![1.0; 6]; 6];
        let p = problem((0..6).collect(), 6, costs);
        assert_eq!(BranchAndBoundSolver::new(3).solve(&p), SolverOutcome::NodeLimit);
    }

    #[test]
    fn registry() {
        assert_eq!(
            SolverKind::from_name("branch_and_bound"),
            Some(SolverKind::BranchAndBound)
        );
        assert_eq!(SolverKind::from_name("gurobi"), None);
        assert_eq!(SolverKind::BranchAndBound.build(10).name(), "branch_and_bound");
    }
}
