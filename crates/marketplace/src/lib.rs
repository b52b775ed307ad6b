//! Marketplace API surface: access tokens, order retrieval with the
//! grouped-shipment fallback, billing info, item attributes, shipment
//! status and invoice-document upload.

pub mod client;
pub mod error;
pub mod token;
pub mod types;

pub use client::{
    HttpMarketplaceApi, InMemoryMarketplaceApi, MarketplaceApi, invoice_upload_accepted,
    resolve_billing_info, resolve_order,
};
pub use error::MarketplaceError;
pub use token::{AccessToken, HttpTokenProvider, StaticTokenProvider, TokenProvider};
pub use types::{BillingInfo, BillingInfoResponse, Item, Order, OrderLine, Pack, Shipment};

/// Convenience type alias for marketplace results.
pub type Result<T> = std::result::Result<T, MarketplaceError>;
