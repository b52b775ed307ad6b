//! Ledger error types.

use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A row for this order already exists (uniqueness constraint hit).
    #[error("Order {0} already recorded in the ledger")]
    DuplicateOrder(String),

    /// No row matched the given key.
    #[error("No ledger record for {0}")]
    RecordNotFound(String),

    /// A stored status value outside the known range.
    #[error("Invalid order status value: {0}")]
    InvalidStatus(i16),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
