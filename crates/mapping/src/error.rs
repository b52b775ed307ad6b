//! Mapping error types.

use thiserror::Error;

/// Errors that can occur during mapping lookups.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The schema name is not a valid SQL identifier.
    #[error("Invalid mapping schema name: {0}")]
    InvalidSchema(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
