//! Error types for linqrs

use thiserror::Error;

/// The main error type for linqrs operations
#[derive(Error, Debug)]
pub enum Error {
    /// A comparison was requested with no pending where/and/or to attach to
    #[error("Invalid use of conditional method: {message}")]
    InvalidConditional { message: String },

    /// A join condition was requested but the join for the active alias is missing
    #[error("Invalid use of conditional join: no join introduces alias '{alias}'")]
    InvalidConditionalJoin { alias: String },

    /// Invalid query configuration
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// Database connection or execution error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A result column could not be converted
    #[error("Unsupported type '{type_name}' for column '{column}'")]
    Decode { column: String, type_name: String },

    /// Repository options were rejected
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Convenience Result type for linqrs operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new dangling comparison error
    pub fn invalid_conditional(message: impl Into<String>) -> Self {
        Self::InvalidConditional {
            message: message.into(),
        }
    }

    /// Create a new dangling join condition error
    pub fn invalid_conditional_join(alias: impl Into<String>) -> Self {
        Self::InvalidConditionalJoin {
            alias: alias.into(),
        }
    }

    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode(column: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error signals misuse of the fluent chain
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::InvalidConditional { .. } | Self::InvalidConditionalJoin { .. }
        )
    }
}
