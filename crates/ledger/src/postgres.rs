use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    LedgerError, Result,
    record::{LedgerRecord, NewLedgerRecord, OrderStatus},
    store::LedgerStore,
};

/// PostgreSQL-backed ledger store implementation.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Creates a new PostgreSQL ledger store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(row: PgRow) -> Result<LedgerRecord> {
        Ok(LedgerRecord {
            order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
            account_token_id: row.try_get("account_token_id")?,
            account_name: row.try_get("account_name")?,
            marketplace_name: row.try_get("marketplace_name")?,
            shipping_id: row.try_get("shipping_id")?,
            document_number: row.try_get("document_number")?,
            invoice_number: row.try_get("invoice_number")?,
            invoice_xml: row.try_get("invoice_xml")?,
            status: OrderStatus::from_i16(row.try_get("status")?)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
        })
    }
}

const RECORD_COLUMNS: &str = "order_id, account_token_id, account_name, marketplace_name, \
     shipping_id, document_number, invoice_number, invoice_xml, status, created_at, updated_at";

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn find(&self, order_id: &OrderId) -> Result<Option<LedgerRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM sales_ledger WHERE order_id = $1"
        ))
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn insert_initial(&self, record: NewLedgerRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sales_ledger
                (order_id, account_token_id, account_name, marketplace_name, shipping_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            "#,
        )
        .bind(record.order_id.as_str())
        .bind(&record.account_token_id)
        .bind(&record.account_name)
        .bind(&record.marketplace_name)
        .bind(&record.shipping_id)
        .bind(OrderStatus::New.as_i16())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // A unique violation here means a concurrent run won the insert.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("sales_ledger_order_id_key")
            {
                return LedgerError::DuplicateOrder(record.order_id.to_string());
            }
            LedgerError::Database(e)
        })?;

        Ok(())
    }

    async fn mark_submitted(
        &self,
        account_token_id: &str,
        order_id: &OrderId,
        document_number: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales_ledger
            SET document_number = $1, status = $2, updated_at = NOW()
            WHERE account_token_id = $3 AND order_id = $4
            "#,
        )
        .bind(document_number)
        .bind(OrderStatus::Submitted.as_i16())
        .bind(account_token_id)
        .bind(order_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::RecordNotFound(order_id.to_string()));
        }
        Ok(())
    }

    async fn find_submitted(&self, order_id: &OrderId) -> Result<Vec<LedgerRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM sales_ledger WHERE order_id = $1 AND status >= $2 ORDER BY created_at ASC"
        ))
        .bind(order_id.as_str())
        .bind(OrderStatus::Submitted.as_i16())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn record_invoice(
        &self,
        document_number: &str,
        invoice_number: &str,
        invoice_xml: &str,
        status: OrderStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sales_ledger
            SET invoice_number = $1, invoice_xml = $2, status = $3, updated_at = NOW()
            WHERE document_number = $4
            "#,
        )
        .bind(invoice_number)
        .bind(invoice_xml)
        .bind(status.as_i16())
        .bind(document_number)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::RecordNotFound(document_number.to_string()));
        }
        Ok(())
    }
}
