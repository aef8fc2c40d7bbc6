//! Errors raised while building an architecture model.

/// Errors from the architecture factory.
#[derive(Debug, thiserror::Error)]
pub enum ArchError {
    /// The requested architecture family is not built in.
    #[error("unknown architecture kind '{0}'")]
    UnknownKind(String),

    /// The array dimensions or resource counts are unusable.
    #[error("invalid architecture parameters: {0}")]
    InvalidParameters(String),

    /// Two nodes were declared with the same key.
    #[error("duplicate resource node {0}")]
    DuplicateNode(String),
}
