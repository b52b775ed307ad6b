//! Marketplace error types.

use thiserror::Error;

/// Errors that can occur against the marketplace API.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// The account's token source was unreachable or malformed.
    #[error("Access token unavailable: {0}")]
    TokenUnavailable(String),

    /// Neither the direct order lookup nor the pack fallback found the order.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Billing information could not be retrieved for the order.
    #[error("Billing info unavailable for order {0}")]
    BillingUnavailable(String),

    /// The API answered with an unexpected status code.
    #[error("Marketplace returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
