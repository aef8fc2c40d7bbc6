//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `tessera.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed (this includes non-numeric
    /// values where numbers are expected).
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("project.application".to_string());
        assert_eq!(format!("{err}"), "missing required field: project.application");
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("engine.population must be > 0".to_string());
        assert_eq!(
            format!("{err}"),
            "validation error: engine.population must be > 0"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}
