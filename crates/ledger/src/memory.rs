use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use tokio::sync::RwLock;

use crate::{
    LedgerError, Result,
    record::{LedgerRecord, NewLedgerRecord, OrderStatus},
    store::LedgerStore,
};

/// In-memory ledger store implementation for testing.
///
/// Keyed by `order_id`, so the uniqueness constraint holds by construction
/// and the duplicate-insert path behaves exactly like the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    records: Arc<RwLock<HashMap<String, LedgerRecord>>>,
    fail_on_insert: Arc<RwLock<bool>>,
    fail_on_mark_submitted: Arc<RwLock<bool>>,
}

impl InMemoryLedgerStore {
    /// Creates a new empty in-memory ledger store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records stored.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns a copy of the record for an order, if any.
    pub async fn get(&self, order_id: &OrderId) -> Option<LedgerRecord> {
        self.records.read().await.get(order_id.as_str()).cloned()
    }

    /// Seeds a record directly, bypassing the insert path.
    pub async fn seed(&self, record: LedgerRecord) {
        self.records
            .write()
            .await
            .insert(record.order_id.as_str().to_string(), record);
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    /// Configures the next initial insert to fail as a database error.
    pub async fn set_fail_on_insert(&self, fail: bool) {
        *self.fail_on_insert.write().await = fail;
    }

    /// Configures the final status write to fail as a database error.
    pub async fn set_fail_on_mark_submitted(&self, fail: bool) {
        *self.fail_on_mark_submitted.write().await = fail;
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find(&self, order_id: &OrderId) -> Result<Option<LedgerRecord>> {
        Ok(self.records.read().await.get(order_id.as_str()).cloned())
    }

    async fn insert_initial(&self, record: NewLedgerRecord) -> Result<()> {
        if *self.fail_on_insert.read().await {
            return Err(LedgerError::Database(sqlx::Error::PoolClosed));
        }
        let mut records = self.records.write().await;
        let key = record.order_id.as_str().to_string();
        if records.contains_key(&key) {
            return Err(LedgerError::DuplicateOrder(key));
        }
        records.insert(key, record.into_record(Utc::now()));
        Ok(())
    }

    async fn mark_submitted(
        &self,
        account_token_id: &str,
        order_id: &OrderId,
        document_number: &str,
    ) -> Result<()> {
        if *self.fail_on_mark_submitted.read().await {
            return Err(LedgerError::Database(sqlx::Error::PoolClosed));
        }
        let mut records = self.records.write().await;
        let record = records
            .get_mut(order_id.as_str())
            .filter(|r| r.account_token_id == account_token_id)
            .ok_or_else(|| LedgerError::RecordNotFound(order_id.to_string()))?;

        record.document_number = Some(document_number.to_string());
        record.status = OrderStatus::Submitted;
        record.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn find_submitted(&self, order_id: &OrderId) -> Result<Vec<LedgerRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.order_id == *order_id && r.status.is_submitted())
            .cloned()
            .collect())
    }

    async fn record_invoice(
        &self,
        document_number: &str,
        invoice_number: &str,
        invoice_xml: &str,
        status: OrderStatus,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .values_mut()
            .find(|r| r.document_number.as_deref() == Some(document_number))
            .ok_or_else(|| LedgerError::RecordNotFound(document_number.to_string()))?;

        record.invoice_number = Some(invoice_number.to_string());
        record.invoice_xml = Some(invoice_xml.to_string());
        record.status = status;
        record.updated_at = Some(Utc::now());
        Ok(())
    }
}
