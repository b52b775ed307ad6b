//! Invoice-sync companion saga.
//!
//! Walks the ledger records of an already-submitted order, pulls the staged
//! invoice from the ERP reporting store and decides per record whether to
//! push the document to the marketplace, leave it scheduled, or complete a
//! no-invoice-required delivery. Per-record failures never abort the batch.

use common::{AccountRegistry, OrderId, ProcessId};
use erp::InvoiceReportStore;
use ledger::{LedgerRecord, LedgerStore, OrderStatus};
use marketplace::{MarketplaceApi, TokenProvider};
use serde::Serialize;

use crate::hub::LogHub;
use crate::log::{StepLogEntry, StepRecorder};
use crate::notify::Notifier;

const STEP_LEDGER_LOOKUP: &str = "ledger-lookup";
const STEP_TOKEN: &str = "token";
const STEP_INVOICE_FETCH: &str = "invoice-fetch";
const STEP_LEDGER_UPDATE: &str = "ledger-update";
const STEP_SHIPMENT_STATUS: &str = "shipment-status";
const STEP_INVOICE_UPLOAD: &str = "invoice-upload";
const STEP_SUMMARY: &str = "summary";

/// Per-record entry in an invoice-sync result.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRecordResult {
    pub order_id: String,
    pub document_number: String,
    pub invoice_number: String,
    pub status: String,
    pub substatus: Option<String>,
}

/// Outcome of one invoice-sync batch.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSyncResult {
    pub total_processed: u32,
    pub success_count: u32,
    pub error_count: u32,
    pub results: Vec<InvoiceRecordResult>,
    pub logs: Vec<StepLogEntry>,
}

/// Drives invoice delivery for orders at status `Submitted` or beyond.
pub struct InvoiceSync<L, T, M, R, N>
where
    L: LedgerStore,
    T: TokenProvider,
    M: MarketplaceApi,
    R: InvoiceReportStore,
    N: Notifier,
{
    ledger: L,
    tokens: T,
    marketplace: M,
    reports: R,
    notifier: N,
    accounts: AccountRegistry,
    hub: LogHub,
}

impl<L, T, M, R, N> InvoiceSync<L, T, M, R, N>
where
    L: LedgerStore,
    T: TokenProvider,
    M: MarketplaceApi,
    R: InvoiceReportStore,
    N: Notifier,
{
    /// Creates a new invoice-sync flow over the given collaborators.
    pub fn new(
        ledger: L,
        tokens: T,
        marketplace: M,
        reports: R,
        notifier: N,
        accounts: AccountRegistry,
        hub: LogHub,
    ) -> Self {
        Self {
            ledger,
            tokens,
            marketplace,
            reports,
            notifier,
            accounts,
            hub,
        }
    }

    /// Runs the sync for every submitted record of one order.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn run(&self, order_id: &OrderId) -> InvoiceSyncResult {
        metrics::counter!("invoice_sync_runs_total").increment(1);
        let mut log = StepRecorder::new(ProcessId::from(order_id), self.hub.clone());

        log.info(
            STEP_LEDGER_LOOKUP,
            format!("syncing invoices for order {order_id}"),
        )
        .await;

        let records = match self.ledger.find_submitted(order_id).await {
            Ok(records) => records,
            Err(e) => {
                log.error(STEP_LEDGER_LOOKUP, format!("ledger lookup failed: {e}"))
                    .await;
                return Self::finish(log, 0, 0, 1, Vec::new()).await;
            }
        };

        if records.is_empty() {
            log.warning(
                STEP_LEDGER_LOOKUP,
                format!("no submitted record for order {order_id}"),
            )
            .await;
            return Self::finish(log, 0, 0, 1, Vec::new()).await;
        }

        let account = self.accounts.resolve(&records[0].account_name.to_lowercase());
        let token = match self.tokens.access_token(&account).await {
            Ok(token) => token,
            Err(e) => {
                log.error(STEP_TOKEN, format!("access token unavailable: {e}"))
                    .await;
                self.notifier
                    .notify(&format!(
                        "INVOICE SYNC FAILED: no access token for account {} ({e})",
                        account.name
                    ))
                    .await;
                return Self::finish(log, 0, 0, 1, Vec::new()).await;
            }
        };

        let mut results = Vec::new();
        let mut success_count = 0;
        let mut error_count = 0;

        for record in &records {
            metrics::counter!("invoice_sync_records_total").increment(1);
            if let Some(outcome) = self
                .sync_record(record, &token, &mut log, &mut success_count, &mut error_count)
                .await
            {
                results.push(outcome);
            }
        }

        let summary = format!(
            "INVOICE SYNC: order {order_id}\n\
             Processed: {} | Successes: {success_count} | Errors: {error_count}",
            records.len(),
        );
        self.notifier.notify(&summary).await;

        Self::finish(log, records.len() as u32, success_count, error_count, results).await
    }

    /// Handles one ledger record; returns `None` when nothing actionable
    /// was found before the shipment was consulted.
    async fn sync_record(
        &self,
        record: &LedgerRecord,
        token: &marketplace::AccessToken,
        log: &mut StepRecorder,
        success_count: &mut u32,
        error_count: &mut u32,
    ) -> Option<InvoiceRecordResult> {
        let Some(document_number) = record.document_number.as_deref() else {
            log.warning(
                STEP_INVOICE_FETCH,
                format!("record for order {} has no document number", record.order_id),
            )
            .await;
            *error_count += 1;
            return None;
        };

        log.info(
            STEP_INVOICE_FETCH,
            format!("fetching staged invoice for document {document_number}"),
        )
        .await;

        let staged = match self.reports.staged_invoice(document_number).await {
            Ok(staged) => staged,
            Err(e) => {
                log.error(
                    STEP_INVOICE_FETCH,
                    format!("reporting store lookup failed: {e}"),
                )
                .await;
                *error_count += 1;
                return None;
            }
        };

        let Some(invoice) = staged.filter(|invoice| invoice.has_document()) else {
            log.warning(
                STEP_INVOICE_FETCH,
                format!("no invoice staged yet for document {document_number}; leaving pending"),
            )
            .await;
            *error_count += 1;
            return None;
        };
        log.success(
            STEP_INVOICE_FETCH,
            format!(
                "invoice {} found for document {document_number}",
                invoice.control_number
            ),
        )
        .await;

        let raw_document = invoice.raw_document.clone().unwrap_or_default();

        if let Err(e) = self
            .ledger
            .record_invoice(
                document_number,
                &invoice.control_number,
                &raw_document,
                OrderStatus::InvoicePending,
            )
            .await
        {
            log.error(STEP_LEDGER_UPDATE, format!("ledger update failed: {e}"))
                .await;
            *error_count += 1;
            return None;
        }

        log.info(
            STEP_SHIPMENT_STATUS,
            format!("checking shipment {}", record.shipping_id),
        )
        .await;
        let shipment = match self.marketplace.shipment(&record.shipping_id, token).await {
            Ok(shipment) => shipment,
            Err(e) => {
                log.error(STEP_SHIPMENT_STATUS, format!("shipment lookup failed: {e}"))
                    .await;
                *error_count += 1;
                return None;
            }
        };
        log.success(
            STEP_SHIPMENT_STATUS,
            format!(
                "shipment {} status {}{}",
                record.shipping_id,
                shipment.status,
                shipment
                    .substatus
                    .as_deref()
                    .map(|s| format!("/{s}"))
                    .unwrap_or_default()
            ),
        )
        .await;

        if shipment.awaits_invoice() {
            log.info(
                STEP_INVOICE_UPLOAD,
                format!("uploading invoice {} to shipment {}", invoice.control_number, record.shipping_id),
            )
            .await;
            match self
                .marketplace
                .upload_invoice(&record.shipping_id, &raw_document, token)
                .await
            {
                Ok(()) => {
                    if let Err(e) = self
                        .ledger
                        .record_invoice(
                            document_number,
                            &invoice.control_number,
                            &raw_document,
                            OrderStatus::Completed,
                        )
                        .await
                    {
                        log.error(STEP_LEDGER_UPDATE, format!("ledger update failed: {e}"))
                            .await;
                    }
                    log.success(
                        STEP_INVOICE_UPLOAD,
                        format!("invoice {} delivered", invoice.control_number),
                    )
                    .await;
                    *success_count += 1;
                }
                Err(e) => {
                    // Fails this record only; the batch moves on.
                    log.error(STEP_INVOICE_UPLOAD, format!("invoice upload failed: {e}"))
                        .await;
                    *error_count += 1;
                }
            }
        } else if shipment.is_scheduled() {
            log.info(
                STEP_SHIPMENT_STATUS,
                format!(
                    "delivery scheduled{}; no action",
                    shipment
                        .scheduled_for()
                        .map(|d| format!(" for {d}"))
                        .unwrap_or_default()
                ),
            )
            .await;
        } else if record.invoice_number.as_deref().is_some_and(|n| !n.is_empty()) {
            // No-invoice-required delivery mode with the invoice already
            // issued: complete without pushing a document.
            if let Err(e) = self
                .ledger
                .record_invoice(
                    document_number,
                    &invoice.control_number,
                    &raw_document,
                    OrderStatus::Completed,
                )
                .await
            {
                log.error(STEP_LEDGER_UPDATE, format!("ledger update failed: {e}"))
                    .await;
                *error_count += 1;
            } else {
                log.success(
                    STEP_SHIPMENT_STATUS,
                    "no-invoice-required delivery; marked completed",
                )
                .await;
                *success_count += 1;
            }
        } else {
            log.info(
                STEP_SHIPMENT_STATUS,
                "awaiting invoice for no-invoice-required delivery",
            )
            .await;
        }

        Some(InvoiceRecordResult {
            order_id: record.order_id.to_string(),
            document_number: document_number.to_string(),
            invoice_number: invoice.control_number.clone(),
            status: shipment.status.clone(),
            substatus: shipment.substatus.clone(),
        })
    }

    async fn finish(
        mut log: StepRecorder,
        total_processed: u32,
        success_count: u32,
        error_count: u32,
        results: Vec<InvoiceRecordResult>,
    ) -> InvoiceSyncResult {
        log.info(
            STEP_SUMMARY,
            format!(
                "invoice sync finished - processed: {total_processed} | successes: {success_count} | errors: {error_count}"
            ),
        )
        .await;

        InvoiceSyncResult {
            total_processed,
            success_count,
            error_count,
            results,
            logs: log.into_entries(),
        }
    }
}
