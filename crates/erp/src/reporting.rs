//! Read-only store over the ERP's reporting tables.
//!
//! Invoices are staged by the ERP after order submission; this store joins
//! the order map against the invoice movement tables to pull the generated
//! document for a given document number.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use crate::Result;

/// Invoice data staged by the ERP for one submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedInvoice {
    /// Invoice control number.
    pub control_number: String,
    /// Issue date as recorded by the ERP.
    pub issue_date: String,
    /// Raw invoice document; absent until the ERP generates it.
    pub raw_document: Option<String>,
    /// ERP-side processing status.
    pub status: String,
}

impl StagedInvoice {
    /// Returns true once a non-empty document is present.
    pub fn has_document(&self) -> bool {
        self.raw_document.as_deref().is_some_and(|doc| !doc.is_empty())
    }
}

/// Read-only lookup of staged invoices by document number.
#[async_trait]
pub trait InvoiceReportStore: Send + Sync {
    /// Fetches the staged invoice for a document number, if the ERP has
    /// produced one.
    async fn staged_invoice(&self, document_number: &str) -> Result<Option<StagedInvoice>>;
}

/// sqlx-backed reporting store.
#[derive(Clone)]
pub struct SqlInvoiceReportStore {
    pool: PgPool,
}

impl SqlInvoiceReportStore {
    /// Creates a reporting store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceReportStore for SqlInvoiceReportStore {
    async fn staged_invoice(&self, document_number: &str) -> Result<Option<StagedInvoice>> {
        let row = sqlx::query(
            r#"
            SELECT m.control_number, m.issued_at, i.document_xml, m.status
            FROM erp_order_map m
            LEFT JOIN erp_sales s
                ON s.order_map_id = m.order_map_id
            LEFT JOIN erp_invoice_movement i
                ON s.company_id = i.company_id
                AND s.control_number = i.invoice_number
                AND s.series = i.series
            WHERE m.order_map_id = $1
            "#,
        )
        .bind(document_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|row| {
                Ok::<_, sqlx::Error>(StagedInvoice {
                    control_number: row.try_get("control_number")?,
                    issue_date: row.try_get("issued_at")?,
                    raw_document: row.try_get("document_xml")?,
                    status: row.try_get("status")?,
                })
            })
            .transpose()?)
    }
}

/// In-memory reporting store for testing.
#[derive(Clone, Default)]
pub struct InMemoryInvoiceReportStore {
    invoices: Arc<RwLock<HashMap<String, StagedInvoice>>>,
}

impl InMemoryInvoiceReportStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an invoice for a document number.
    pub async fn stage(&self, document_number: &str, invoice: StagedInvoice) {
        self.invoices
            .write()
            .await
            .insert(document_number.to_string(), invoice);
    }
}

#[async_trait]
impl InvoiceReportStore for InMemoryInvoiceReportStore {
    async fn staged_invoice(&self, document_number: &str) -> Result<Option<StagedInvoice>> {
        Ok(self.invoices.read().await.get(document_number).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn staged_invoice_lookup() {
        let store = InMemoryInvoiceReportStore::new();
        store
            .stage(
                "770001",
                StagedInvoice {
                    control_number: "55001".to_string(),
                    issue_date: "2025-08-05".to_string(),
                    raw_document: Some("<nfe/>".to_string()),
                    status: "FATURADO".to_string(),
                },
            )
            .await;

        let invoice = store.staged_invoice("770001").await.unwrap().unwrap();
        assert!(invoice.has_document());
        assert_eq!(invoice.control_number, "55001");

        assert!(store.staged_invoice("000000").await.unwrap().is_none());
    }

    #[test]
    fn empty_document_is_not_a_document() {
        let invoice = StagedInvoice {
            control_number: "55001".to_string(),
            issue_date: "2025-08-05".to_string(),
            raw_document: Some(String::new()),
            status: "PENDENTE".to_string(),
        };
        assert!(!invoice.has_document());
    }
}
