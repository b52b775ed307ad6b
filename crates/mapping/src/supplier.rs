//! Fixed supplier-code table and its special cases.
//!
//! Company codes come from the mapping tables; supplier codes are assigned
//! from this table, which is maintained here rather than in the database
//! because it changes with commercial agreements, not with catalog data.

/// The alias company selected when a part number carries the `LC` marker.
pub const ALIAS_COMPANY: &str = "LUCIOS";

/// The fallback company for items with no usable mapping row.
pub const FALLBACK_COMPANY: &str = "OUTROS";

/// Part-number substring that overrides the mapped company to the alias.
pub const ALIAS_PART_MARKER: &str = "LC";

/// Supplier and canonical company pair assigned to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyAssignment {
    /// Supplier code sent in the order payload.
    pub supplier_code: String,
    /// Canonical company code after table-driven aliasing.
    pub company_code: String,
}

impl CompanyAssignment {
    fn new(supplier_code: &str, company_code: &str) -> Self {
        Self {
            supplier_code: supplier_code.to_string(),
            company_code: company_code.to_string(),
        }
    }
}

/// Resolves a company code to its supplier assignment.
///
/// Some company codes are commercial aliases: the table below both assigns
/// the supplier and rewrites the company to its canonical code. The alias
/// company only carries a supplier when the item actually had a mapping row
/// (`has_mapping`); otherwise there is nothing to buy it from and the caller
/// must treat the item as unmappable. Unknown codes resolve to `None`.
pub fn supplier_for_company(company_code: &str, has_mapping: bool) -> Option<CompanyAssignment> {
    match company_code {
        "17" => Some(CompanyAssignment::new("7", "17")),
        "144" => Some(CompanyAssignment::new("13", "144")),
        "44" => Some(CompanyAssignment::new("13", "144")),
        "12" => Some(CompanyAssignment::new("12", "17")),
        "40" => Some(CompanyAssignment::new("1", "40")),
        "34" => Some(CompanyAssignment::new("9", "34")),
        "41" => Some(CompanyAssignment::new("11", "41")),
        "47" => Some(CompanyAssignment::new("17", "47")),
        "140" => Some(CompanyAssignment::new("1", "140")),
        ALIAS_COMPANY if has_mapping => Some(CompanyAssignment::new("8", ALIAS_COMPANY)),
        ALIAS_COMPANY => None,
        FALLBACK_COMPANY => Some(CompanyAssignment::new("8", "17")),
        _ => None,
    }
}

/// Maps a canonical company code to the schema holding its SKU table.
pub fn schema_for_company(company_code: &str) -> &'static str {
    match company_code {
        "144" | "44" => "psa",
        "40" | "140" => "ford",
        "34" => "jeep",
        "41" | "47" => "renault",
        // 17, 12, the alias and fallback companies all live in principal.
        _ => "principal",
    }
}
