//! Integration error taxonomy.
//!
//! Every fatal variant short-circuits the saga at the step that raised it;
//! `MappingNotFound` is the one per-item, recoverable case and only becomes
//! fatal as `NoValidItems` when nothing resolves.

use common::OrderId;
use erp::ErpError;
use marketplace::MarketplaceError;
use thiserror::Error;

/// Errors produced by the integration saga and its companion flows.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The ledger already holds a record for this order.
    #[error("Order {0} was already processed")]
    AlreadyProcessed(OrderId),

    /// Marketplace or ERP credentials could not be acquired.
    #[error("Access token unavailable: {0}")]
    TokenUnavailable(String),

    /// Neither the direct lookup nor the pack fallback found the order.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// A line item had no mapping row (recoverable, per item).
    #[error("No mapping for item {0}")]
    MappingNotFound(String),

    /// No line item resolved to a SKU; nothing to submit.
    #[error("No line item resolved to a valid SKU")]
    NoValidItems,

    /// The ERP refused a customer or address upsert.
    #[error("ERP registration failed: {0}")]
    ErpRegistrationFailed(String),

    /// The ERP refused the order or returned no document number.
    #[error("ERP rejected the order: {0}")]
    ErpOrderRejected(String),

    /// A ledger write failed; committed ERP side effects are not undone.
    #[error("Ledger write failed: {0}")]
    LedgerWriteFailed(String),

    /// Transient transport or upstream failure; not retried.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<MarketplaceError> for IntegrationError {
    fn from(err: MarketplaceError) -> Self {
        match err {
            MarketplaceError::TokenUnavailable(msg) => IntegrationError::TokenUnavailable(msg),
            MarketplaceError::OrderNotFound(id) => IntegrationError::OrderNotFound(id),
            other => IntegrationError::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<ErpError> for IntegrationError {
    fn from(err: ErpError) -> Self {
        match err {
            ErpError::TokenUnavailable(msg) => IntegrationError::TokenUnavailable(msg),
            ErpError::RegistrationFailed(msg) => IntegrationError::ErpRegistrationFailed(msg),
            ErpError::OrderRejected(msg) => IntegrationError::ErpOrderRejected(msg),
            other => IntegrationError::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<mapping::MappingError> for IntegrationError {
    fn from(err: mapping::MappingError) -> Self {
        IntegrationError::UpstreamUnavailable(err.to_string())
    }
}
