//! Parsing and validation of `tessera.toml` run configuration files.
//!
//! This crate reads the run configuration and produces a strongly-typed
//! [`RunConfig`]: architecture parameters, evolutionary-engine parameters,
//! router settings, the objective list, and free-form numeric simulation
//! parameters. Names of routers, solvers and objectives stay strings here;
//! they are resolved against the mapper's registries at engine setup.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
