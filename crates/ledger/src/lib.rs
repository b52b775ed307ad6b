//! Durable per-order ledger used for idempotency and final-status tracking.
//!
//! One row per integrated order. The `order_id` uniqueness constraint is the
//! mechanism that closes the idempotency race: two concurrent runs for the
//! same order can both pass the read-check, but only one insert succeeds.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use error::LedgerError;
pub use memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use record::{LedgerRecord, NewLedgerRecord, OrderStatus};
pub use store::LedgerStore;

/// Convenience type alias for ledger results.
pub type Result<T> = std::result::Result<T, LedgerError>;
