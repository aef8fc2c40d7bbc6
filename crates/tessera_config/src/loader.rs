//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{EngineConfig, RouterConfig, RunConfig};
use std::path::Path;

/// The configuration file looked up inside a run directory.
pub const CONFIG_FILE_NAME: &str = "tessera.toml";

/// Loads and validates a run configuration.
///
/// `path` may name the file itself or a directory containing `tessera.toml`.
pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let config_path = if path.is_dir() {
        path.join(CONFIG_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a run configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.application.is_empty() {
        return Err(ConfigError::MissingField("project.application".to_string()));
    }
    let arch = &config.architecture;
    if arch.width == 0 || arch.height == 0 {
        return Err(invalid("architecture width and height must be > 0"));
    }
    if arch.pipeline_cuts >= arch.height {
        return Err(invalid(format!(
            "architecture.pipeline_cuts ({}) must be less than height ({})",
            arch.pipeline_cuts, arch.height
        )));
    }
    validate_engine(&config.engine)?;
    validate_router(&config.router)?;
    if config.objectives.names.is_empty() {
        return Err(ConfigError::MissingField("objectives.names".to_string()));
    }
    if let Some((name, value)) = config.sim.iter().find(|(_, v)| !v.is_finite()) {
        return Err(invalid(format!("sim.{name} must be finite, got {value}")));
    }
    Ok(())
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("population", engine.population),
        ("offspring", engine.offspring),
        ("max_generations", engine.max_generations),
        ("initial_mappings", engine.initial_mappings),
        ("layout_iterations", engine.layout_iterations),
    ] {
        if value == 0 {
            return Err(invalid(format!("engine.{name} must be > 0")));
        }
    }
    for (name, value) in [
        ("crossover_rate", engine.crossover_rate),
        ("mutation_rate", engine.mutation_rate),
        ("swap_probability", engine.swap_probability),
        ("topo_probability", engine.topo_probability),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(format!("engine.{name} must be within [0, 1], got {value}")));
        }
    }
    if engine.crossover_rate + engine.mutation_rate > 1.0 {
        return Err(invalid(
            "engine.crossover_rate + engine.mutation_rate must not exceed 1",
        ));
    }
    Ok(())
}

fn validate_router(router: &RouterConfig) -> Result<(), ConfigError> {
    if router.penalty_cost <= 0.0 || router.alu_out_weight <= 0.0 {
        return Err(invalid("router.penalty_cost and router.alu_out_weight must be > 0"));
    }
    if router.penalty_ceiling.is_some_and(|c| c <= 0.0) {
        return Err(invalid("router.penalty_ceiling must be > 0 when set"));
    }
    let m = router.failure_multipliers;
    if !(m.comp > m.konst && m.konst > m.input && m.input > m.output && m.output >= 1.0) {
        return Err(invalid(
            "router.failure_multipliers must satisfy comp > const > input > output >= 1",
        ));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
