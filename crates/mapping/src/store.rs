//! Item-mapping lookup store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use crate::{MappingError, Result};

/// One row of an account's item-mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Marketplace item id (e.g. `MLB111`).
    pub item_id: String,
    /// Internal SKU.
    pub sku: String,
    /// Company code owning the SKU; may be empty in legacy rows.
    pub company_code: String,
}

/// Read-only lookup of marketplace item ids against per-account tables.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Looks up an item in the given schema's mapping table.
    ///
    /// Returns `None` on a miss; a miss is recoverable for the caller.
    async fn lookup(&self, schema: &str, item_id: &str) -> Result<Option<MappingEntry>>;
}

/// PostgreSQL-backed mapping store.
///
/// Each account's table lives in its own schema (`<schema>.item_mapping`),
/// mirroring how the tables are maintained upstream.
#[derive(Clone)]
pub struct PostgresMappingStore {
    pool: PgPool,
}

impl PostgresMappingStore {
    /// Creates a new PostgreSQL mapping store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Schema names come from the account registry, but they are still
    /// interpolated into SQL, so restrict them to plain identifiers.
    fn validate_schema(schema: &str) -> Result<()> {
        let valid = !schema.is_empty()
            && schema
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(MappingError::InvalidSchema(schema.to_string()))
        }
    }
}

#[async_trait]
impl MappingStore for PostgresMappingStore {
    async fn lookup(&self, schema: &str, item_id: &str) -> Result<Option<MappingEntry>> {
        Self::validate_schema(schema)?;

        let row = sqlx::query(&format!(
            "SELECT item_id, sku, company_code FROM {schema}.item_mapping WHERE item_id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            Ok::<_, sqlx::Error>(MappingEntry {
                item_id: row.try_get("item_id")?,
                sku: row.try_get("sku")?,
                company_code: row.try_get("company_code")?,
            })
        })
        .transpose()?)
    }
}

/// In-memory mapping store for testing, keyed by `(schema, item_id)`.
#[derive(Clone, Default)]
pub struct InMemoryMappingStore {
    entries: Arc<RwLock<HashMap<(String, String), MappingEntry>>>,
}

impl InMemoryMappingStore {
    /// Creates a new empty in-memory mapping store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mapping entry to the given schema.
    pub async fn insert(&self, schema: &str, entry: MappingEntry) {
        self.entries
            .write()
            .await
            .insert((schema.to_string(), entry.item_id.clone()), entry);
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn lookup(&self, schema: &str, item_id: &str) -> Result<Option<MappingEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(schema.to_string(), item_id.to_string()))
            .cloned())
    }
}
