//! ERP gateway client and the read-only invoice reporting store.

pub mod error;
pub mod gateway;
pub mod reporting;
pub mod types;

pub use error::ErpError;
pub use gateway::{ErpCredentials, ErpGateway, HttpErpGateway, InMemoryErpGateway};
pub use reporting::{InMemoryInvoiceReportStore, InvoiceReportStore, SqlInvoiceReportStore, StagedInvoice};
pub use types::{
    AddressUpsert, CustomerUpsert, DocumentNumber, OrderItemPayload, OrderSubmission,
    PaymentPayload,
};

/// Convenience type alias for ERP results.
pub type Result<T> = std::result::Result<T, ErpError>;
