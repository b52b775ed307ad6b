//! Ledger row types.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Lifecycle status of an integrated order.
///
/// Status transitions:
/// ```text
/// New ──► Submitted ──► InvoicePending ──► Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Row inserted, ERP order not yet confirmed.
    #[default]
    New,

    /// ERP order submitted; document number recorded.
    Submitted,

    /// Invoice pulled from the ERP reporting store, not yet delivered.
    InvoicePending,

    /// Invoice delivered to the marketplace (terminal).
    Completed,
}

impl OrderStatus {
    /// Returns the numeric value stored in the database.
    pub fn as_i16(&self) -> i16 {
        match self {
            OrderStatus::New => 0,
            OrderStatus::Submitted => 1,
            OrderStatus::InvoicePending => 2,
            OrderStatus::Completed => 3,
        }
    }

    /// Decodes a stored numeric value.
    pub fn from_i16(value: i16) -> Result<Self, LedgerError> {
        match value {
            0 => Ok(OrderStatus::New),
            1 => Ok(OrderStatus::Submitted),
            2 => Ok(OrderStatus::InvoicePending),
            3 => Ok(OrderStatus::Completed),
            other => Err(LedgerError::InvalidStatus(other)),
        }
    }

    /// Returns true once the ERP order has been submitted.
    pub fn is_submitted(&self) -> bool {
        self.as_i16() >= 1
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::New => "New",
            OrderStatus::Submitted => "Submitted",
            OrderStatus::InvoicePending => "InvoicePending",
            OrderStatus::Completed => "Completed",
        };
        write!(f, "{name}")
    }
}

/// One ledger row: the durable record of an order's integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Marketplace order id (unique per successful run).
    pub order_id: OrderId,
    /// Account identity segment extracted from the access token.
    pub account_token_id: String,
    /// Uppercased account name.
    pub account_name: String,
    /// Marketplace the order came from.
    pub marketplace_name: String,
    /// Marketplace shipment id.
    pub shipping_id: String,
    /// ERP-issued document number, set by the final status write.
    pub document_number: Option<String>,
    /// Invoice control number, set by the invoice sync.
    pub invoice_number: Option<String>,
    /// Raw invoice document, set by the invoice sync.
    pub invoice_xml: Option<String>,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp, if any write happened after insert.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for the initial ledger insert.
#[derive(Debug, Clone)]
pub struct NewLedgerRecord {
    pub order_id: OrderId,
    pub account_token_id: String,
    pub account_name: String,
    pub marketplace_name: String,
    pub shipping_id: String,
}

impl NewLedgerRecord {
    /// Expands the insert payload into a full row with status `New`.
    pub fn into_record(self, created_at: DateTime<Utc>) -> LedgerRecord {
        LedgerRecord {
            order_id: self.order_id,
            account_token_id: self.account_token_id,
            account_name: self.account_name,
            marketplace_name: self.marketplace_name,
            shipping_id: self.shipping_id,
            document_number: None,
            invoice_number: None,
            invoice_xml: None,
            status: OrderStatus::New,
            created_at,
            updated_at: None,
        }
    }
}
