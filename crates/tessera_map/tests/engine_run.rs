//! End-to-end engine runs on small fabrics.

use tessera_arch::{Direction, GridArchitecture, NodeKey, ResourceGraph};
use tessera_common::Coord;
use tessera_config::{load_config_from_str, RunConfig};
use tessera_diagnostics::DiagnosticSink;
use tessera_dfg::{Application, ApplicationBuilder};
use tessera_map::engine::{build_architecture, nsga2, ParetoArchive, NO_LAYERED_SEEDS};
use tessera_map::record::{read_record, write_record};
use tessera_map::{
    CancelToken, Engine, Individual, Mapping, MappingRecord, SetupError, StopReason,
};

fn config(extra_engine: &str, arch: &str) -> RunConfig {
    let text = format!(
        r#"
[project]
name = "test"
application = "app.json"

[architecture]
{arch}

[engine]
population = 8
offspring = 8
initial_mappings = 8
layout_iterations = 20
workers = 2
seed = 7
{extra_engine}
"#
    );
    load_config_from_str(&text).unwrap()
}

fn chain() -> Application {
    let mut b = ApplicationBuilder::new("chain");
    let a = b.op("a", "add").unwrap();
    let m = b.op("m", "mul").unwrap();
    let s = b.op("s", "sub").unwrap();
    b.edge(a, m, 0).edge(m, s, 0).constant(3, m, 1);
    let x = b.input("x").unwrap();
    b.input_edge(x, a, 0);
    b.output("y", s).unwrap();
    b.build().unwrap()
}

const MESH_3X3: &str = r#"
width = 3
height = 3
const_registers = 2
input_ports = 3
output_ports = 3
"#;

fn setup(config: &RunConfig, app: Application) -> Result<Engine, SetupError> {
    let arch = build_architecture(&config.project.name, &config.architecture)?;
    Engine::setup(config, arch, app, &DiagnosticSink::new())
}

#[test]
fn runs_to_generation_limit() {
    let config = config("max_generations = 5\nmin_generations = 0", MESH_3X3);
    let mut engine = setup(&config, chain()).unwrap();
    assert!(!engine.population().is_empty());
    assert!(engine.population().len() <= 8);

    let outcome = engine.run(&CancelToken::new());
    assert_eq!(outcome.stop_reason, StopReason::MaxGenerations);
    assert_eq!(outcome.generations, 5);
    assert_eq!(outcome.fitness_log.len(), 6);
    assert!(!outcome.archive.is_empty());
    for ind in &outcome.archive {
        assert!(ind.is_valid());
        assert!(ind.mapping().is_injective());
        assert_eq!(ind.fitness().len(), 2);
    }
    assert!(engine.population().len() <= 8);
}

#[test]
fn stalls_on_a_trivial_problem() {
    let mut b = ApplicationBuilder::new("one");
    b.op("only", "nop").unwrap();
    let app = b.build().unwrap();
    let config = config(
        "max_generations = 1000\nmax_stall = 3\nmin_generations = 0",
        "width = 2\nheight = 2",
    );
    let mut engine = setup(&config, app).unwrap();
    let outcome = engine.run(&CancelToken::new());
    assert_eq!(outcome.stop_reason, StopReason::Stalled);
    assert_eq!(outcome.generations, 3);
    assert_eq!(outcome.stall, 3);
    assert_eq!(outcome.archive.len(), 1);
    assert_eq!(outcome.archive[0].fitness(), &[0.0, 1.0]);
}

#[test]
fn cancellation_waits_for_min_generations() {
    let config = config("max_generations = 50\nmax_stall = 50\nmin_generations = 2", MESH_3X3);
    let mut engine = setup(&config, chain()).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let outcome = engine.run(&cancel);
    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert_eq!(outcome.generations, 2);
}

#[test]
fn rejects_oversized_application() {
    let config = config("", "width = 1\nheight = 2");
    let err = setup(&config, chain()).err().unwrap();
    assert!(matches!(
        err,
        SetupError::ApplicationTooLarge { ops: 3, available: 2 }
    ));
}

#[test]
fn rejects_unknown_objective() {
    let mut config = config("", MESH_3X3);
    config.objectives.names.push("latency".to_string());
    let err = setup(&config, chain()).err().unwrap();
    assert!(matches!(err, SetupError::UnknownObjective(name) if name == "latency"));
}

#[test]
fn missing_ports_are_warnings() {
    let config = config("max_generations = 1", "width = 3\nheight = 3\nconst_registers = 1");
    let arch = build_architecture("bare", &config.architecture).unwrap();
    let sink = DiagnosticSink::new();
    let engine = Engine::setup(&config, arch, chain(), &sink).unwrap();
    assert!(!sink.has_errors());
    assert_eq!(sink.diagnostics().len(), 2);
    assert_eq!(engine.plan().to_string(), "comp -> const");
}

#[test]
fn random_seeds_cover_a_failed_layout() {
    let mut config = config("max_generations = 1", MESH_3X3);
    config.engine.layout_iterations = 0;
    let arch = build_architecture("mesh", &config.architecture).unwrap();
    let sink = DiagnosticSink::new();
    let engine = Engine::setup(&config, arch, chain(), &sink).unwrap();
    assert_eq!(sink.count(NO_LAYERED_SEEDS), 1);
    assert!(!engine.population().is_empty());
}

/// Two compute units joined by a single eastbound wire.
fn one_way_pair() -> GridArchitecture {
    let mut g = ResourceGraph::new();
    let west = g.add_node(NodeKey::Compute(Coord::new(0, 0))).unwrap();
    let east = g.add_node(NodeKey::Compute(Coord::new(1, 0))).unwrap();
    let wire = g
        .add_node(NodeKey::Switch(Coord::new(0, 0), Direction::East))
        .unwrap();
    g.add_edge(west, wire, 1.0);
    g.add_edge(wire, east, 1.0);
    GridArchitecture::from_graph("one-way", 2, 1, g, 0, false).unwrap()
}

#[test]
fn unroutable_mapping_never_beats_a_routed_one() {
    let mut b = ApplicationBuilder::new("pair");
    let a = b.op("a", "add").unwrap();
    let c = b.op("c", "add").unwrap();
    b.edge(a, c, 0);
    let app = b.build().unwrap();

    let mut config = config("max_generations = 1", MESH_3X3);
    config.objectives.names = vec!["switch_usage".to_string(), "map_width".to_string()];
    let sink = DiagnosticSink::new();
    let engine = Engine::setup(&config, Box::new(one_way_pair()), app, &sink).unwrap();

    let place = |coords: [(u32, u32); 2]| {
        Individual::new(
            Mapping::new(coords.iter().map(|&(x, y)| Coord::new(x, y)).collect()),
            vec![],
        )
    };
    let mut good = place([(0, 0), (1, 0)]);
    let mut bad = place([(1, 0), (0, 0)]);
    assert_eq!(engine.evaluate(&mut good), vec![1.0, 2.0]);
    engine.evaluate(&mut bad);
    assert!(good.is_valid());
    assert!(!bad.is_valid());
    // Routing nothing uses fewer switches than routing the edge.
    assert!(!nsga2::dominates(bad.fitness(), good.fitness()));
    assert!(nsga2::dominates(good.fitness(), bad.fitness()));

    let mut archive = ParetoArchive::new(vec![1.0, 1.0]);
    archive.update([&good, &bad]);
    let valid = archive.into_valid();
    assert_eq!(valid.len(), 1);
    assert_eq!(valid[0].mapping(), good.mapping());
}

#[test]
fn record_from_run() {
    let config = config("max_generations = 2\nmin_generations = 0", MESH_3X3);
    let mut engine = setup(&config, chain()).unwrap();
    let outcome = engine.run(&CancelToken::new());
    let archived = outcome.archive.len();
    let record = MappingRecord::from_run(&engine, outcome);
    assert_eq!(record.header.architecture, "test");
    assert_eq!(record.header.application, "chain");
    assert_eq!(record.header.objectives, vec!["wire_length", "map_width"]);
    assert_eq!(record.header.weights, vec![-1.0, -1.0]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chain.tsra");
    write_record(&path, &record).unwrap();
    let back = read_record(&path).unwrap();
    assert_eq!(back.header, record.header);
    assert_eq!(back.payload.archive.len(), archived);
    assert_eq!(back.payload.fitness_log.len(), 3);
}
