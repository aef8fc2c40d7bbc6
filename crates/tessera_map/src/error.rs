//! Engine setup errors.

use tessera_arch::ArchError;
use tessera_config::ConfigError;

/// Configuration-time failures of the mapper; a run is never started after
/// one of these.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The run configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The architecture could not be built.
    #[error(transparent)]
    Arch(#[from] ArchError),

    /// The configured router is not registered.
    #[error("unknown router `{0}`")]
    UnknownRouter(String),

    /// The configured constant-assignment solver is not registered.
    #[error("unknown solver `{0}`")]
    UnknownSolver(String),

    /// A configured objective is not registered.
    #[error("unknown objective `{0}`")]
    UnknownObjective(String),

    /// The application has more operations than the fabric has compute units.
    #[error("application needs {ops} compute units but the fabric has {available}")]
    ApplicationTooLarge {
        /// Operations in the application.
        ops: usize,
        /// Compute units in the fabric.
        available: usize,
    },

    /// Neither placer produced a usable seed mapping.
    #[error("no initial mapping could be generated")]
    NoSeedMappings,

    /// The evaluation worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}
