//! Error types for odps-review.
//!
//! Defines the main error enum used throughout the engine. Most engine
//! operations fold these into the `error` field of their result object;
//! only project-name validation propagates to the caller.

use thiserror::Error;

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Connection errors (endpoint unreachable, auth rejected, missing project, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors reported by ODPS (syntax errors, failed tasks, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// SQL text could not be tokenized or split into statements.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid arguments supplied by the caller.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected responses, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a parse error with the given message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the bare message without the category prefix.
    ///
    /// Result objects carry this text in their `error` field.
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(msg)
            | Self::Query(msg)
            | Self::Parse(msg)
            | Self::Validation(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Parse(_) => "Parse Error",
            Self::Validation(_) => "Validation Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;
