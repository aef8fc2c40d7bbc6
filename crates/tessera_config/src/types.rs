//! Configuration types deserialized from `tessera.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Run metadata and the application to map.
    pub project: ProjectMeta,
    /// Target fabric parameters.
    pub architecture: ArchConfig,
    /// Evolutionary engine parameters.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Router and constant-assignment solver settings.
    #[serde(default)]
    pub router: RouterConfig,
    /// Objective selection.
    #[serde(default)]
    pub objectives: ObjectivesConfig,
    /// Free-form numeric simulation parameters handed to every objective.
    #[serde(default)]
    pub sim: BTreeMap<String, f64>,
}

/// Run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The run name.
    pub name: String,
    /// Path to the application dataflow graph (JSON), relative to the
    /// configuration file.
    pub application: String,
    /// A brief description of the run.
    #[serde(default)]
    pub description: String,
}

/// Target fabric parameters for the built-in architecture factory.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchConfig {
    /// Architecture family; only `"mesh"` is built in.
    #[serde(default = "default_arch_kind")]
    pub kind: String,
    /// Number of columns of processing elements.
    pub width: u32,
    /// Number of rows of processing elements.
    pub height: u32,
    /// Number of constant registers.
    #[serde(default)]
    pub const_registers: u32,
    /// Number of input ports (above row 0).
    #[serde(default)]
    pub input_ports: u32,
    /// Number of output ports (below the last row).
    #[serde(default)]
    pub output_ports: u32,
    /// Number of potential pipeline-register cut lines.
    #[serde(default)]
    pub pipeline_cuts: u32,
    /// Whether constants must be routed explicitly through constant registers.
    #[serde(default = "default_true")]
    pub const_routing: bool,
}

/// Evolutionary engine parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Population size kept after each selection (mu).
    pub population: usize,
    /// Offspring produced per generation (lambda).
    pub offspring: usize,
    /// Hard generation limit.
    pub max_generations: usize,
    /// Generations without a change to the archive before stopping.
    pub max_stall: usize,
    /// Minimum generations before an external stop request is honoured.
    pub min_generations: usize,
    /// Probability that an offspring is produced by crossover.
    pub crossover_rate: f64,
    /// Probability that an offspring is produced by mutation.
    pub mutation_rate: f64,
    /// Probability that a mutation is a swap rather than a relocation.
    pub swap_probability: f64,
    /// Random individuals injected every generation.
    pub random_injection: usize,
    /// Layout-based seed mappings attempted at setup.
    pub initial_mappings: usize,
    /// Probability that a random mapping is assigned in topological order.
    pub topo_probability: f64,
    /// Rounding attempts per layout-based seed before giving up.
    pub layout_iterations: usize,
    /// Evaluation worker threads; 0 uses one per core.
    pub workers: usize,
    /// RNG seed; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population: 100,
            offspring: 100,
            max_generations: 300,
            max_stall: 100,
            min_generations: 10,
            crossover_rate: 0.7,
            mutation_rate: 0.3,
            swap_probability: 0.5,
            random_injection: 10,
            initial_mappings: 100,
            topo_probability: 0.5,
            layout_iterations: 100,
            workers: 0,
            seed: None,
        }
    }
}

/// Router settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Router implementation name (`"astar"`).
    pub kind: String,
    /// Constant-assignment solver name (`"branch_and_bound"`).
    pub solver: String,
    /// Cost charged for one unroutable dependency.
    pub penalty_cost: f64,
    /// Accumulated routing cost above which a mapping fails even when every
    /// connection was routed. Unset means only unroutable connections fail.
    pub penalty_ceiling: Option<f64>,
    /// Weight of a compute unit's output edges while it is not a source.
    pub alu_out_weight: f64,
    /// Search-node budget of the assignment solver.
    pub solver_node_limit: u64,
    /// Cost multipliers applied to a mapping whose routing fails in a phase.
    pub failure_multipliers: FailureMultipliers,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            kind: "astar".to_string(),
            solver: "branch_and_bound".to_string(),
            penalty_cost: 1000.0,
            penalty_ceiling: None,
            alu_out_weight: 1000.0,
            solver_node_limit: 1_000_000,
            failure_multipliers: FailureMultipliers::default(),
        }
    }
}

/// Per-phase cost multipliers for individuals that fail routing.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FailureMultipliers {
    /// Failure during computation-edge routing.
    pub comp: f64,
    /// Failure during constant routing.
    #[serde(rename = "const")]
    pub konst: f64,
    /// Failure during input routing.
    pub input: f64,
    /// Failure during output routing.
    pub output: f64,
}

impl Default for FailureMultipliers {
    fn default() -> Self {
        Self {
            comp: 40.0,
            konst: 30.0,
            input: 20.0,
            output: 10.0,
        }
    }
}

/// Objective selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectivesConfig {
    /// Objective names in fitness-vector order.
    pub names: Vec<String>,
}

impl Default for ObjectivesConfig {
    fn default() -> Self {
        Self {
            names: vec!["wire_length".to_string(), "map_width".to_string()],
        }
    }
}

fn default_arch_kind() -> String {
    "mesh".to_string()
}

fn default_true() -> bool {
    true
}
