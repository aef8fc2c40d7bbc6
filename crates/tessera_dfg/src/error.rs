//! Error types for application loading.

use std::path::PathBuf;

/// Errors raised while building or loading an application.
#[derive(Debug, thiserror::Error)]
pub enum DfgError {
    /// The application file could not be read.
    #[error("failed to read application {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The JSON content is malformed.
    #[error("failed to parse application: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two operations or ports share a name.
    #[error("duplicate name `{0}`")]
    DuplicateName(String),

    /// An operand or output refers to a name that is neither an operation
    /// nor an input.
    #[error("`{user}` refers to unknown operand `{name}`")]
    UnknownOperand {
        /// The operation or output that holds the reference.
        user: String,
        /// The unresolved name.
        name: String,
    },

    /// The computation subgraph contains a cycle.
    #[error("dataflow graph has a cycle through `{0}`")]
    Cycle(String),

    /// The application has no operations.
    #[error("application `{0}` has no operations")]
    Empty(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_operand() {
        let err = DfgError::UnknownOperand {
            user: "add0".into(),
            name: "x9".into(),
        };
        assert_eq!(err.to_string(), "`add0` refers to unknown operand `x9`");
    }

    #[test]
    fn display_cycle() {
        assert_eq!(
            DfgError::Cycle("mul1".into()).to_string(),
            "dataflow graph has a cycle through `mul1`"
        );
    }
}
