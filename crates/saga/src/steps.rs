//! Integration saga step names.

/// Step name: ledger dedup gate.
pub const STEP_IDEMPOTENCY_CHECK: &str = "idempotency-check";

/// Step name: marketplace access-token acquisition.
pub const STEP_TOKEN: &str = "token";

/// Step name: order retrieval (direct or via pack fallback).
pub const STEP_ORDER_FETCH: &str = "order-fetch";

/// Step name: line-item to SKU/supplier resolution.
pub const STEP_MAPPING: &str = "mapping";

/// Step name: customer registration in the ERP.
pub const STEP_CUSTOMER: &str = "customer";

/// Step name: address registration in the ERP.
pub const STEP_ADDRESS: &str = "address";

/// Step name: initial ledger insert (closes the idempotency race).
pub const STEP_LEDGER_INITIAL_WRITE: &str = "ledger-initial-write";

/// Step name: order submission to the ERP.
pub const STEP_ORDER_SUBMIT: &str = "order-submit";

/// Step name: final ledger status write.
pub const STEP_LEDGER_FINAL_WRITE: &str = "ledger-final-write";

/// Result status string reported for a successfully integrated order.
pub const STATUS_SUCCESS: &str = "sucesso";
