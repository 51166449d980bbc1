use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    /// A field is flagged with a kind its data does not support.
    #[error("Field '{field}' is misconfigured: {reason}")]
    Configuration { field: String, reason: String },

    /// A single record value could not be coerced to its mapped type.
    #[error("Field '{field}' could not be transformed: {reason}")]
    Transform { field: String, reason: String },

    /// The search engine call failed.
    #[error("Search engine error: {0}")]
    Transport(String),

    /// Pushing a new mapping failed; the previous mapping stays in effect.
    #[error("Mapping was not applied: {0}")]
    MappingApply(String),

    #[error("Content store unavailable: {0}")]
    StoreUnavailable(String),
}

impl Error {
    pub fn transport(e: impl std::fmt::Display) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
