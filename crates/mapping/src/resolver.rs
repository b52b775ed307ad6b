//! Per-order resolution of marketplace line items.
//!
//! The company/supplier pair is decided once per order, from its first line
//! item; SKUs are then looked up item by item in the company's schema. A
//! per-item miss skips that item and never aborts the pass.

use crate::store::MappingStore;
use crate::supplier::{
    ALIAS_COMPANY, ALIAS_PART_MARKER, CompanyAssignment, FALLBACK_COMPANY, schema_for_company,
    supplier_for_company,
};
use crate::Result;

/// A marketplace line item as seen by the resolver.
#[derive(Debug, Clone)]
pub struct LineItem {
    pub item_id: String,
    pub unit_price: f64,
    pub quantity: u32,
}

/// A line item resolved to an internal SKU and supplier.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    pub sku: String,
    pub supplier_code: String,
    pub unit_price: f64,
    pub quantity: u32,
}

/// Outcome of a resolution pass over an order's line items.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The order-level company/supplier assignment.
    pub company: CompanyAssignment,
    /// Items that resolved to a SKU.
    pub items: Vec<ResolvedItem>,
    /// Item ids skipped for lack of a mapping row.
    pub skipped: Vec<String>,
}

impl Resolution {
    /// Sum of `unit_price * quantity` over the resolved items.
    pub fn total_value(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.unit_price * f64::from(i.quantity))
            .sum()
    }
}

/// Determines the order's company/supplier assignment from its first line
/// item.
///
/// The part number wins over the mapping row: a part carrying the alias
/// marker always routes to the alias company. A missing or company-less
/// mapping row falls back to the catch-all company. Returns `None` when the
/// table yields no supplier for the resulting company, in which case the
/// order has no purchasable items.
pub async fn resolve_company<M: MappingStore + ?Sized>(
    store: &M,
    account_schema: &str,
    first_item_id: &str,
    part_number: &str,
) -> Result<Option<CompanyAssignment>> {
    let entry = store.lookup(account_schema, first_item_id).await?;
    let has_mapping = entry.is_some();

    let company = if part_number.contains(ALIAS_PART_MARKER) {
        ALIAS_COMPANY.to_string()
    } else {
        match entry {
            Some(e) if !e.company_code.is_empty() => e.company_code,
            _ => FALLBACK_COMPANY.to_string(),
        }
    };

    Ok(supplier_for_company(&company, has_mapping))
}

/// Resolves each line item to a SKU in the company's schema.
///
/// Misses are skipped, not fatal; callers decide what an empty result means.
pub async fn resolve_items<M: MappingStore + ?Sized>(
    store: &M,
    company: CompanyAssignment,
    line_items: &[LineItem],
) -> Result<Resolution> {
    let schema = schema_for_company(&company.company_code);
    let mut items = Vec::new();
    let mut skipped = Vec::new();

    for line_item in line_items {
        match store.lookup(schema, &line_item.item_id).await? {
            Some(entry) => items.push(ResolvedItem {
                sku: entry.sku,
                supplier_code: company.supplier_code.clone(),
                unit_price: line_item.unit_price,
                quantity: line_item.quantity,
            }),
            None => {
                tracing::warn!(item_id = %line_item.item_id, schema, "no mapping row, skipping item");
                skipped.push(line_item.item_id.clone());
            }
        }
    }

    Ok(Resolution {
        company,
        items,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryMappingStore, MappingEntry};

    fn entry(item_id: &str, sku: &str, company: &str) -> MappingEntry {
        MappingEntry {
            item_id: item_id.to_string(),
            sku: sku.to_string(),
            company_code: company.to_string(),
        }
    }

    fn line(item_id: &str, unit_price: f64, quantity: u32) -> LineItem {
        LineItem {
            item_id: item_id.to_string(),
            unit_price,
            quantity,
        }
    }

    #[tokio::test]
    async fn mapped_item_resolves_company_and_sku() {
        let store = InMemoryMappingStore::new();
        store.insert("psa", entry("MLB111", "ABC123", "17")).await;
        store.insert("principal", entry("MLB111", "ABC123", "17")).await;

        let company = resolve_company(&store, "psa", "MLB111", "XJ900")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(company.supplier_code, "7");
        assert_eq!(company.company_code, "17");

        let resolution = resolve_items(&store, company, &[line("MLB111", 150.0, 2)])
            .await
            .unwrap();
        assert_eq!(resolution.items.len(), 1);
        assert_eq!(resolution.items[0].sku, "ABC123");
        assert_eq!(resolution.items[0].supplier_code, "7");
        assert!(resolution.skipped.is_empty());
        assert_eq!(resolution.total_value(), 300.0);
    }

    #[tokio::test]
    async fn alias_marker_in_part_number_overrides_company() {
        let store = InMemoryMappingStore::new();
        store.insert("psa", entry("MLB222", "DEF456", "17")).await;
        store.insert("principal", entry("MLB222", "DEF456", "17")).await;

        let company = resolve_company(&store, "psa", "MLB222", "LC4477")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(company.company_code, ALIAS_COMPANY);
        assert_eq!(company.supplier_code, "8");
    }

    #[tokio::test]
    async fn unmapped_first_item_falls_back() {
        let store = InMemoryMappingStore::new();
        // No row for the first item; a later item maps in principal.
        store.insert("principal", entry("MLB333", "GHI789", "17")).await;

        let company = resolve_company(&store, "psa", "MLB000", "XJ900")
            .await
            .unwrap()
            .unwrap();
        // Fallback buys through company 17.
        assert_eq!(company.supplier_code, "8");
        assert_eq!(company.company_code, "17");

        let resolution = resolve_items(
            &store,
            company,
            &[line("MLB000", 10.0, 1), line("MLB333", 20.0, 1)],
        )
        .await
        .unwrap();
        assert_eq!(resolution.items.len(), 1);
        assert_eq!(resolution.items[0].sku, "GHI789");
        assert_eq!(resolution.skipped, vec!["MLB000".to_string()]);
    }

    #[tokio::test]
    async fn all_misses_resolve_to_empty_item_list() {
        let store = InMemoryMappingStore::new();

        let company = resolve_company(&store, "psa", "MLB000", "XJ900")
            .await
            .unwrap()
            .unwrap();
        let resolution = resolve_items(&store, company, &[line("MLB000", 10.0, 1)])
            .await
            .unwrap();
        assert!(resolution.items.is_empty());
        assert_eq!(resolution.skipped.len(), 1);
    }

    #[tokio::test]
    async fn alias_part_without_mapping_yields_no_company() {
        let store = InMemoryMappingStore::new();
        let company = resolve_company(&store, "psa", "MLB000", "LC123")
            .await
            .unwrap();
        assert!(company.is_none());
    }
}
