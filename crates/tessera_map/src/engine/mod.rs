//! The evolutionary search loop.
//!
//! [`Engine::setup`] resolves the configured router, solver and objectives,
//! decides which routing phases are required and seeds the population.
//! [`Engine::run`] then iterates generations:
//!
//! 1. produce offspring by crossover, mutation or reproduction,
//! 2. evaluate offspring plus a batch of fresh random individuals on the
//!    worker pool,
//! 3. select the next population by non-dominated sorting,
//! 4. update the Pareto archive and the stall counter,
//!
//! until the generation limit, the stall limit, or a cancellation observed
//! after the minimum generation count.

mod archive;
mod cancel;
mod evaluate;
pub mod nsga2;
mod objectives;

pub use archive::ParetoArchive;
pub use cancel::CancelToken;
pub use evaluate::{
    failure_multiplier, route_bound, route_mapping, PhasePlan, RoutingOutcome,
    MISSING_CONST_REGISTERS, MISSING_INPUT_PORTS, MISSING_OUTPUT_PORTS, PORT_SHORTAGE,
};
pub use objectives::{
    EvalContext, MapArea, MapWidth, Objective, ObjectiveKind, SwitchUsage, WireLength,
};

use crate::error::SetupError;
use crate::individual::Individual;
use crate::mapping::{dedup_mappings, Mapping};
use crate::placement::{generate_init_mappings, make_random_mappings};
use crate::routing::{RouteContext, Router, RouterKind, RouterOptions, SolverKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use tessera_arch::{load_architecture, Architecture, GridParams};
use tessera_common::Coord;
use tessera_config::{ArchConfig, ConfigError, EngineConfig, FailureMultipliers, RunConfig};
use tessera_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tessera_dfg::Application;
use tracing::{debug, info, warn};

/// The layered layout could not place the application on the array.
pub const NO_LAYERED_SEEDS: DiagnosticCode = DiagnosticCode::new(Category::Search, 1);

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The generation limit was reached.
    MaxGenerations,
    /// The archive did not change for the stall limit.
    Stalled,
    /// An external stop was requested.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::MaxGenerations => "generation limit reached",
            StopReason::Stalled => "archive stalled",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// The result of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Valid members of the final Pareto archive.
    pub archive: Vec<Individual>,
    /// Archive fitness set after seeding and after every generation.
    pub fitness_log: Vec<Vec<Vec<f64>>>,
    /// Generations completed.
    pub generations: usize,
    /// Stall counter at termination.
    pub stall: usize,
    /// Termination cause.
    pub stop_reason: StopReason,
}

/// Builds the fabric described by the `[architecture]` table.
pub fn build_architecture(name: &str, config: &ArchConfig) -> Result<Box<dyn Architecture>, SetupError> {
    let params = GridParams {
        width: config.width,
        height: config.height,
        const_registers: config.const_registers,
        input_ports: config.input_ports,
        output_ports: config.output_ports,
        pipeline_cuts: config.pipeline_cuts,
        const_routing: config.const_routing,
    };
    Ok(load_architecture(&config.kind, name, params)?)
}

/// The NSGA-II mapping engine.
pub struct Engine {
    arch: Box<dyn Architecture>,
    app: Application,
    params: EngineConfig,
    multipliers: FailureMultipliers,
    sim: BTreeMap<String, f64>,
    router: Box<dyn Router>,
    objectives: Vec<Box<dyn Objective>>,
    route_bound: f64,
    plan: PhasePlan,
    coords: Vec<Coord>,
    population: Vec<Individual>,
    pool: rayon::ThreadPool,
    rng: StdRng,
}

impl Engine {
    /// Validates the configuration against the fabric and application,
    /// resolves registries, and seeds the population.
    ///
    /// Non-fatal compatibility findings go to `sink`.
    pub fn setup(
        config: &RunConfig,
        mut arch: Box<dyn Architecture>,
        app: Application,
        sink: &DiagnosticSink,
    ) -> Result<Self, SetupError> {
        let params = config.engine.clone();
        if params.population == 0 || params.offspring == 0 {
            return Err(ConfigError::ValidationError(
                "engine.population and engine.offspring must be > 0".to_string(),
            )
            .into());
        }

        let coords = arch.coords();
        if app.op_count() > coords.len() {
            return Err(SetupError::ApplicationTooLarge {
                ops: app.op_count(),
                available: coords.len(),
            });
        }

        let solver = SolverKind::from_name(&config.router.solver)
            .ok_or_else(|| SetupError::UnknownSolver(config.router.solver.clone()))?
            .build(config.router.solver_node_limit);
        let options = RouterOptions::from(&config.router);
        let router = RouterKind::from_name(&config.router.kind)
            .ok_or_else(|| SetupError::UnknownRouter(config.router.kind.clone()))?
            .build(options, solver);
        let objectives = config
            .objectives
            .names
            .iter()
            .map(|name| {
                ObjectiveKind::from_name(name)
                    .map(ObjectiveKind::build)
                    .ok_or_else(|| SetupError::UnknownObjective(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        router.set_default_weights(arch.as_mut());
        let plan = PhasePlan::required(arch.as_ref(), &app, sink);
        let route_bound = route_bound(&app, &options);
        debug!(router = router.name(), phases = %plan, route_bound, "routing plan");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.workers)
            .thread_name(|i| format!("tessera-eval-{i}"))
            .build()
            .map_err(|e| SetupError::WorkerPool(e.to_string()))?;
        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (width, height) = arch.dimensions();
        let layered = generate_init_mappings(
            &app,
            width,
            height,
            params.initial_mappings,
            params.layout_iterations,
            &mut rng,
        );
        if layered.is_empty() {
            warn!("layered layout produced no seed mapping");
            sink.emit(
                Diagnostic::warning(NO_LAYERED_SEEDS, "layered layout produced no seed mapping")
                    .with_note("the initial population is drawn from random placements only"),
            );
        }
        let random = make_random_mappings(
            &app,
            width,
            height,
            params.initial_mappings,
            params.topo_probability,
            &mut rng,
        );
        let mut seeds: Vec<Mapping> = dedup_mappings(layered.into_iter().chain(random).collect());
        seeds.retain(|m| on_fabric(arch.as_ref(), m));
        seeds.truncate(params.population);
        if seeds.is_empty() {
            return Err(SetupError::NoSeedMappings);
        }
        let pipeline_len = arch.pipeline_len();
        let population = seeds
            .into_iter()
            .map(|m| Individual::with_random_pipeline(m, pipeline_len, &mut rng))
            .collect::<Vec<_>>();
        debug!(seeds = population.len(), "population seeded");

        Ok(Self {
            arch,
            app,
            params,
            multipliers: config.router.failure_multipliers,
            sim: config.sim.clone(),
            router,
            objectives,
            route_bound,
            plan,
            coords,
            population,
            pool,
            rng,
        })
    }

    /// The fabric, with router base weights applied.
    pub fn arch(&self) -> &dyn Architecture {
        self.arch.as_ref()
    }

    /// The application being mapped.
    pub fn app(&self) -> &Application {
        &self.app
    }

    /// Simulation parameters handed to the objectives.
    pub fn sim(&self) -> &BTreeMap<String, f64> {
        &self.sim
    }

    /// The routing phases this run performs.
    pub fn plan(&self) -> &PhasePlan {
        &self.plan
    }

    /// The current population.
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Objective names in fitness order.
    pub fn objective_names(&self) -> Vec<String> {
        self.objectives.iter().map(|o| o.name().to_string()).collect()
    }

    /// Fitness weights in fitness order: `-1.0` minimise, `1.0` maximise.
    pub fn fitness_weights(&self) -> Vec<f64> {
        self.objectives
            .iter()
            .map(|o| if o.is_minimize() { -1.0 } else { 1.0 })
            .collect()
    }

    /// Multipliers turning every objective into "smaller is better".
    fn signs(&self) -> Vec<f64> {
        self.objectives
            .iter()
            .map(|o| if o.is_minimize() { 1.0 } else { -1.0 })
            .collect()
    }

    /// Routes the individual's mapping, then scores it with every objective.
    /// An invalid mapping gets each objective's invalid score, so it never
    /// dominates a valid one. Touches nothing but `individual`.
    pub fn evaluate(&self, individual: &mut Individual) -> Vec<f64> {
        let outcome = {
            let ctx = RouteContext {
                arch: self.arch.as_ref(),
                app: &self.app,
                mapping: individual.mapping(),
                pipeline: individual.pipeline(),
            };
            route_mapping(self.router.as_ref(), &ctx, &self.plan, &self.multipliers)
        };
        individual.set_routing(outcome.overlay, outcome.cost, outcome.valid);
        let ctx = EvalContext {
            arch: self.arch.as_ref(),
            app: &self.app,
            sim: &self.sim,
            penalty: self.router.options().penalty_cost,
            route_bound: self.route_bound,
        };
        let valid = individual.is_valid();
        let fitness: Vec<f64> = self
            .objectives
            .iter()
            .map(|o| {
                if valid {
                    o.evaluate(&ctx, individual)
                } else {
                    o.invalid_score(&ctx, individual)
                }
            })
            .collect();
        individual.set_fitness(fitness.clone());
        fitness
    }

    /// Evaluates every individual without a fitness vector, in parallel.
    pub fn evaluate_all(&self, batch: &mut [Individual]) {
        self.pool.install(|| {
            batch
                .par_iter_mut()
                .filter(|ind| !ind.is_evaluated())
                .for_each(|ind| {
                    self.evaluate(ind);
                });
        });
    }

    /// Runs generations until a stop condition holds.
    pub fn run(&mut self, cancel: &CancelToken) -> RunOutcome {
        let mut population = std::mem::take(&mut self.population);
        self.evaluate_all(&mut population);
        self.population = population;

        let mut archive = ParetoArchive::new(self.signs());
        archive.update(&self.population);
        let mut fitness_log = vec![archive.fitness_set()];
        let mut generation = 0;
        let mut stall = 0;

        let stop_reason = loop {
            if generation >= self.params.max_generations {
                break StopReason::MaxGenerations;
            }
            if stall >= self.params.max_stall {
                break StopReason::Stalled;
            }
            if generation >= self.params.min_generations && cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            generation += 1;

            let mut batch = self.vary();
            batch.extend(self.inject());
            self.evaluate_all(&mut batch);

            let mut pool = std::mem::take(&mut self.population);
            pool.extend(batch);
            self.population = self.select(pool);

            let before = archive.fitness_set();
            archive.update(&self.population);
            let after = archive.fitness_set();
            if after == before {
                stall += 1;
            } else {
                stall = 0;
            }
            let valid = self.population.iter().filter(|i| i.is_valid()).count();
            info!(
                generation,
                archive = archive.len(),
                valid,
                stall,
                "generation complete"
            );
            fitness_log.push(after);
        };

        info!(%stop_reason, generation, "search finished");
        RunOutcome {
            archive: archive.into_valid(),
            fitness_log,
            generations: generation,
            stall,
            stop_reason,
        }
    }

    /// Produces the offspring pool; each child comes from exactly one of
    /// crossover, mutation or reproduction.
    fn vary(&mut self) -> Vec<Individual> {
        let parents = &self.population;
        let rng = &mut self.rng;
        let n = parents.len();
        let mut offspring = Vec::with_capacity(self.params.offspring);
        if n == 0 {
            return offspring;
        }
        for _ in 0..self.params.offspring {
            let roll: f64 = rng.gen();
            if roll < self.params.crossover_rate && n >= 2 {
                let a = rng.gen_range(0..n);
                let b = (a + rng.gen_range(1..n)) % n;
                let (mut child, _) = parents[a].crossover(&parents[b], rng);
                child.repair(&self.coords, rng);
                offspring.push(child);
            } else if roll < self.params.crossover_rate + self.params.mutation_rate {
                let mut child = parents[rng.gen_range(0..n)].clone();
                child.mutate(&self.coords, self.params.swap_probability, rng);
                offspring.push(child);
            } else {
                offspring.push(parents[rng.gen_range(0..n)].clone());
            }
        }
        offspring
    }

    /// Fresh random individuals to resist premature convergence.
    fn inject(&mut self) -> Vec<Individual> {
        if self.params.random_injection == 0 {
            return Vec::new();
        }
        let (width, height) = self.arch.dimensions();
        let mappings = make_random_mappings(
            &self.app,
            width,
            height,
            self.params.random_injection,
            self.params.topo_probability,
            &mut self.rng,
        );
        let pipeline_len = self.arch.pipeline_len();
        mappings
            .into_iter()
            .filter(|m| on_fabric(self.arch.as_ref(), m))
            .map(|m| Individual::with_random_pipeline(m, pipeline_len, &mut self.rng))
            .collect()
    }

    /// Keeps `population` individuals by non-dominated rank and crowding.
    fn select(&self, pool: Vec<Individual>) -> Vec<Individual> {
        let signs = self.signs();
        let points: Vec<Vec<f64>> = pool
            .iter()
            .map(|ind| ind.fitness().iter().zip(&signs).map(|(f, s)| f * s).collect())
            .collect();
        let chosen = nsga2::select(&points, self.params.population);
        let mut slots: Vec<Option<Individual>> = pool.into_iter().map(Some).collect();
        chosen.into_iter().filter_map(|i| slots[i].take()).collect()
    }
}

fn on_fabric(arch: &dyn Architecture, mapping: &Mapping) -> bool {
    mapping.coords().iter().all(|&c| arch.compute_node(c).is_some())
}
