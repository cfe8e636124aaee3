//! Error types for the persistence layer.
//!
//! Errors in this crate never cross the [`QueryExecutor`](crate::executor::QueryExecutor)
//! boundary: the executor converts every [`BackendError`] into the neutral
//! result for the statement. They are still typed so that backends, the
//! prober and configuration loading can report precisely what went wrong.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// Errors raised by a database backend or one of its connections.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Establishing or acquiring a connection failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Acquisition did not complete within the connect timeout.
    #[error("connection to {backend_name} timed out after {timeout_ms}ms")]
    Timeout {
        backend_name: String,
        timeout_ms: u64,
    },

    /// Statement execution failed.
    #[error("query execution failed on {backend_name}: {message}")]
    QueryError {
        backend_name: String,
        message: String,
    },

    /// The number of bound parameters does not match the statement.
    #[error("parameter binding mismatch: {placeholders} placeholders, {params} parameters")]
    BindingMismatch { placeholders: usize, params: usize },

    /// Schema bootstrap failed.
    #[error("schema initialization failed: {message}")]
    SchemaError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BackendError {
    /// Shorthand for a [`BackendError::QueryError`].
    pub fn query(backend_name: &str, err: impl std::fmt::Display) -> Self {
        BackendError::QueryError {
            backend_name: backend_name.to_string(),
            message: err.to_string(),
        }
    }

    /// Shorthand for a [`BackendError::ConnectionFailed`].
    pub fn connection(backend_name: &str, err: impl std::fmt::Display) -> Self {
        BackendError::ConnectionFailed {
            backend_name: backend_name.to_string(),
            message: err.to_string(),
        }
    }

    /// Returns true for errors raised before a statement reached the database.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable { .. }
                | BackendError::ConnectionFailed { .. }
                | BackendError::Timeout { .. }
        )
    }
}

/// Errors raised while turning configuration into endpoints.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field holds a value that cannot be used.
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// The requested engine was not compiled into this build.
    #[error("database engine '{engine}' is not enabled in this build (enable the '{engine}' feature)")]
    EngineNotEnabled { engine: String },

    /// Building a connection pool failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
