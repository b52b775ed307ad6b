//! The ledger store trait.

use async_trait::async_trait;
use common::OrderId;

use crate::Result;
use crate::record::{LedgerRecord, NewLedgerRecord, OrderStatus};

/// Durable store for per-order integration records.
///
/// Implementations must enforce uniqueness on `order_id` at insert time:
/// the saga's read-check alone cannot close the window between two
/// concurrent runs of the same order.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns the record for an order, if one exists.
    async fn find(&self, order_id: &OrderId) -> Result<Option<LedgerRecord>>;

    /// Inserts the initial row for an order with status `New`.
    ///
    /// Fails with [`crate::LedgerError::DuplicateOrder`] if a row for this
    /// order already exists.
    async fn insert_initial(&self, record: NewLedgerRecord) -> Result<()>;

    /// Records the ERP document number and moves the row to `Submitted`.
    ///
    /// Keyed by `(account_token_id, order_id)` as written by the initial
    /// insert.
    async fn mark_submitted(
        &self,
        account_token_id: &str,
        order_id: &OrderId,
        document_number: &str,
    ) -> Result<()>;

    /// Returns the records for an order that have reached `Submitted` or
    /// beyond, i.e. the candidates for invoice synchronization.
    async fn find_submitted(&self, order_id: &OrderId) -> Result<Vec<LedgerRecord>>;

    /// Stores invoice data and a new status, keyed by the ERP document
    /// number.
    async fn record_invoice(
        &self,
        document_number: &str,
        invoice_number: &str,
        invoice_xml: &str,
        status: OrderStatus,
    ) -> Result<()>;
}
