//! Shared helpers for CLI commands: config resolution, loading the
//! application and fabric, engine setup, and diagnostic rendering.

use std::path::{Path, PathBuf};

use tessera_arch::Architecture;
use tessera_config::{RunConfig, CONFIG_FILE_NAME};
use tessera_diagnostics::{DiagnosticRenderer, DiagnosticSink, Severity, TerminalRenderer};
use tessera_dfg::Application;
use tessera_map::engine::build_architecture;
use tessera_map::Engine;

use crate::GlobalArgs;

/// Everything a command needs after loading a run.
pub struct LoadedRun {
    /// Directory the configuration was read from.
    pub root: PathBuf,
    /// The validated configuration.
    pub config: RunConfig,
    /// The application named by `project.application`.
    pub app: Application,
    /// The fabric described by `[architecture]`.
    pub arch: Box<dyn Architecture>,
}

/// Resolves `--config` to a configuration file path.
///
/// Accepts a file, a directory holding `tessera.toml`, or nothing (the
/// current directory).
pub fn resolve_config_path(arg: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = match arg {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };
    let file = if path.is_dir() {
        path.join(CONFIG_FILE_NAME)
    } else {
        path
    };
    if !file.is_file() {
        return Err(format!("no configuration found at {}", file.display()).into());
    }
    Ok(file)
}

/// Loads the configuration, the application and the fabric.
pub fn load_run(config_arg: Option<&str>) -> Result<LoadedRun, Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config_arg)?;
    let root = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let config = tessera_config::load_config(&config_path)?;
    let app = tessera_dfg::load_application(&root.join(&config.project.application))?;
    let arch = build_architecture(&config.project.name, &config.architecture)?;
    Ok(LoadedRun {
        root,
        config,
        app,
        arch,
    })
}

/// Sets up the engine for a loaded run, collecting findings into `sink`.
pub fn setup_engine(
    run: LoadedRun,
    sink: &DiagnosticSink,
) -> Result<(PathBuf, Engine), Box<dyn std::error::Error>> {
    let LoadedRun {
        root,
        config,
        app,
        arch,
    } = run;
    let engine = Engine::setup(&config, arch, app, sink)?;
    Ok((root, engine))
}

/// Renders collected diagnostics to stderr (text) or stdout (JSON).
/// Returns the number of errors.
pub fn render_diagnostics(sink: &DiagnosticSink, global: &GlobalArgs, json: bool) -> usize {
    let diagnostics = sink.take_all();
    if json {
        let text = serde_json::to_string_pretty(&diagnostics).unwrap_or_else(|_| "[]".to_string());
        println!("{text}");
    } else if !global.quiet {
        let renderer = TerminalRenderer::new(global.color);
        for diag in &diagnostics {
            eprint!("{}", renderer.render(diag));
        }
    }
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONFIG: &str = r#"
[project]
name = "inc"
application = "inc.json"

[architecture]
width = 2
height = 2

[engine]
population = 4
offspring = 4
initial_mappings = 4
layout_iterations = 10
seed = 1
"#;

    const APP: &str = r#"{
  "name": "inc",
  "inputs": ["x"],
  "operations": [
    {"name": "a", "opcode": "add", "operands": ["x", {"const": 1}]},
    {"name": "b", "opcode": "neg", "operands": ["a"]}
  ],
  "outputs": [{"name": "y", "from": "b"}]
}"#;

    fn write_run(dir: &Path) {
        fs::write(dir.join(CONFIG_FILE_NAME), CONFIG).unwrap();
        fs::write(dir.join("inc.json"), APP).unwrap();
    }

    #[test]
    fn resolve_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        write_run(dir.path());
        let from_dir = resolve_config_path(dir.path().to_str()).unwrap();
        assert!(from_dir.ends_with(CONFIG_FILE_NAME));
        let from_file = resolve_config_path(from_dir.to_str()).unwrap();
        assert_eq!(from_dir, from_file);
    }

    #[test]
    fn resolve_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_config_path(dir.path().to_str()).is_err());
    }

    #[test]
    fn load_and_setup() {
        let dir = tempfile::tempdir().unwrap();
        write_run(dir.path());
        let run = load_run(dir.path().to_str()).unwrap();
        assert_eq!(run.app.op_count(), 2);
        assert_eq!(run.arch.dimensions(), (2, 2));
        let sink = DiagnosticSink::new();
        let (_, engine) = setup_engine(run, &sink).unwrap();
        // The bare fabric has no ports or constant registers.
        assert_eq!(sink.diagnostics().len(), 3);
        assert_eq!(engine.plan().to_string(), "comp -> const");
    }
}
