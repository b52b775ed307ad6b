//! Order-integration saga.
//!
//! Drives a marketplace order through the fixed step sequence
//! [idempotency-check, token, order-fetch, mapping, customer, address,
//! ledger-initial-write, order-submit, ledger-final-write], emitting one
//! ordered step log per run and ending in exactly one of two terminal
//! outcomes. There are no automatic retries and no compensation: ERP side
//! effects committed before a later failure stay committed.
//!
//! The companion [`InvoiceSync`] flow delivers generated invoice documents
//! back to the marketplace for orders already submitted.

pub mod coordinator;
pub mod customer;
pub mod error;
pub mod hub;
pub mod invoice;
pub mod log;
pub mod notify;
pub mod steps;

pub use coordinator::{IntegrationRequest, IntegrationSaga, OrderResult, SagaResult};
pub use error::IntegrationError;
pub use hub::{LogHub, SubscriberId, Subscription};
pub use invoice::{InvoiceRecordResult, InvoiceSync, InvoiceSyncResult};
pub use log::{LogLevel, StepLogEntry, StepRecorder};
pub use notify::{Notifier, RecordingNotifier, WebhookNotifier};
