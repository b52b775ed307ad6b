//! Marketplace item to internal SKU and supplier resolution.
//!
//! Lookup tables are externally maintained, one schema per account. The
//! supplier-code table is fixed and ships with the binary.

pub mod error;
pub mod resolver;
pub mod store;
pub mod supplier;

pub use error::MappingError;
pub use resolver::{LineItem, ResolvedItem, Resolution, resolve_company, resolve_items};
pub use store::{InMemoryMappingStore, MappingEntry, MappingStore, PostgresMappingStore};
pub use supplier::{CompanyAssignment, schema_for_company, supplier_for_company};

/// Convenience type alias for mapping results.
pub type Result<T> = std::result::Result<T, MappingError>;
