//! ERP error types.

use thiserror::Error;

/// Errors that can occur against the ERP gateway and reporting store.
#[derive(Debug, Error)]
pub enum ErpError {
    /// Gateway token could not be acquired.
    #[error("ERP token unavailable: {0}")]
    TokenUnavailable(String),

    /// A customer or address upsert was refused.
    #[error("ERP registration failed: {0}")]
    RegistrationFailed(String),

    /// Order submission was refused or returned no document number.
    #[error("ERP rejected the order: {0}")]
    OrderRejected(String),

    /// The gateway answered with an unexpected status code.
    #[error("ERP gateway returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Reporting-store database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
