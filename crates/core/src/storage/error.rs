use thiserror::Error;

use crate::cache::CacheError;

/// Errors that can occur when constructing pagination parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("Invalid pagination: per_page must be at least 1")]
    InvalidPerPage,
    #[error("Invalid pagination: page must be at least 1")]
    InvalidPage,
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{model} not found: {id}")]
    NotFound { model: String, id: String },
    #[error("Model {found} is not supported by this repository, supported model is {expected}")]
    ModelMismatch { expected: String, found: String },
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Unknown scope {scope} on {model}")]
    UnknownScope { model: String, scope: String },
    #[error("Invalid arguments for {scope}: {reason}")]
    InvalidArguments { scope: String, reason: String },
    #[error("{command} produced a value instead of narrowing the query")]
    UnexpectedValue { command: String },
    #[error(transparent)]
    InvalidPagination(#[from] PaginationError),
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepositoryError {
    /// Shorthand for [`RepositoryError::InvalidArguments`].
    pub fn invalid_arguments(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        RepositoryError::InvalidArguments {
            scope: scope.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
