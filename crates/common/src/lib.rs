//! Shared types for the order-integration service.

pub mod account;
pub mod types;

pub use account::{AccountConfig, AccountRegistry, TokenSource};
pub use types::{OrderId, ProcessId};
