//! Integration saga coordinator.

use common::{AccountRegistry, OrderId, ProcessId};
use erp::{ErpGateway, OrderItemPayload, OrderSubmission, PaymentPayload};
use ledger::{LedgerError, LedgerStore, NewLedgerRecord};
use mapping::MappingStore;
use marketplace::{MarketplaceApi, Order, TokenProvider, resolve_billing_info, resolve_order};
use serde::{Deserialize, Serialize};

use crate::customer::{address_for_customer, address_summary, customer_from_billing};
use crate::error::IntegrationError;
use crate::hub::LogHub;
use crate::log::{StepLogEntry, StepRecorder};
use crate::notify::Notifier;
use crate::steps;

// Submission constants the gateway expects on marketplace orders. The fixed
// web-order id and card number are carried over from the upstream contract
// as-is; see DESIGN.md before touching them.
const WEB_ORDER_ID: u64 = 1005502702;
const INTERMEDIARY_TAX_ID: &str = "03361252000134";
const INTERMEDIARY_NAME: &str = "Mercado Livre";
const BUYER_LABEL_PREFIX: &str = "ECOMML";
const PAYMENT_BRAND: &str = "MP";
const PAYMENT_KIND: &str = "CREDITO";
const PAYMENT_CARD: &str = "9999999999999999";
const PAYMENT_AUTHORIZATION: &str = "01071531";

/// Input contract consumed from the web layer.
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationRequest {
    pub account: String,
    pub marketplace: String,
    pub order_id: OrderId,
}

/// Per-order entry in a saga result.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub order_id: String,
    pub document_number: String,
    pub status: String,
}

/// Outcome of one saga invocation, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SagaResult {
    pub total_processed: u32,
    pub success_count: u32,
    pub error_count: u32,
    pub results: Vec<OrderResult>,
    pub logs: Vec<StepLogEntry>,
}

/// Orchestrates the order-integration saga.
///
/// Steps run strictly in sequence; the first fatal error short-circuits the
/// run with exactly one error-level entry naming the step. Committed ERP
/// side effects are never rolled back.
pub struct IntegrationSaga<L, T, M, S, E, N>
where
    L: LedgerStore,
    T: TokenProvider,
    M: MarketplaceApi,
    S: MappingStore,
    E: ErpGateway,
    N: Notifier,
{
    ledger: L,
    tokens: T,
    marketplace: M,
    mappings: S,
    erp: E,
    notifier: N,
    accounts: AccountRegistry,
    hub: LogHub,
}

impl<L, T, M, S, E, N> IntegrationSaga<L, T, M, S, E, N>
where
    L: LedgerStore,
    T: TokenProvider,
    M: MarketplaceApi,
    S: MappingStore,
    E: ErpGateway,
    N: Notifier,
{
    /// Creates a new saga over the given collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: L,
        tokens: T,
        marketplace: M,
        mappings: S,
        erp: E,
        notifier: N,
        accounts: AccountRegistry,
        hub: LogHub,
    ) -> Self {
        Self {
            ledger,
            tokens,
            marketplace,
            mappings,
            erp,
            notifier,
            accounts,
            hub,
        }
    }

    /// The hub carrying this saga's live log stream.
    pub fn hub(&self) -> &LogHub {
        &self.hub
    }

    /// Executes the integration saga for one order.
    ///
    /// Always returns a result; failures are encoded in the counters and
    /// the step log rather than an `Err`.
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id, account = %request.account))]
    pub async fn execute(&self, request: IntegrationRequest) -> SagaResult {
        metrics::counter!("integration_runs_total").increment(1);
        let run_start = std::time::Instant::now();

        let account_label = request.account.to_uppercase();
        let mut log = StepRecorder::new(ProcessId::from(&request.order_id), self.hub.clone());

        // 1. Idempotency check
        log.info(
            steps::STEP_IDEMPOTENCY_CHECK,
            format!(
                "{account_label} ({}) - order {} received",
                request.marketplace, request.order_id
            ),
        )
        .await;
        log.info(
            steps::STEP_IDEMPOTENCY_CHECK,
            "checking whether the order was already processed",
        )
        .await;

        match self.ledger.find(&request.order_id).await {
            Ok(None) => {}
            Ok(Some(_)) => {
                log.warning(
                    steps::STEP_IDEMPOTENCY_CHECK,
                    IntegrationError::AlreadyProcessed(request.order_id.clone()).to_string(),
                )
                .await;
                return Self::already_processed_result(log, run_start);
            }
            Err(e) => {
                return self
                    .fail(
                        log,
                        steps::STEP_IDEMPOTENCY_CHECK,
                        &request,
                        IntegrationError::UpstreamUnavailable(e.to_string()),
                        run_start,
                    )
                    .await;
            }
        }

        // 2. Marketplace token
        log.info(steps::STEP_TOKEN, "resolving marketplace access token")
            .await;
        let account = self.accounts.resolve(&request.account);
        let token = match self.tokens.access_token(&account).await {
            Ok(token) => {
                log.success(steps::STEP_TOKEN, "marketplace access token resolved")
                    .await;
                token
            }
            Err(e) => {
                return self
                    .fail(log, steps::STEP_TOKEN, &request, e.into(), run_start)
                    .await;
            }
        };

        // 3. Order fetch (direct, with pack fallback)
        log.info(
            steps::STEP_ORDER_FETCH,
            format!("fetching order {}", request.order_id),
        )
        .await;
        let order = match resolve_order(&self.marketplace, request.order_id.as_str(), &token).await
        {
            Ok(order) => {
                log.success(
                    steps::STEP_ORDER_FETCH,
                    format!(
                        "order {} fetched with {} item(s)",
                        order.id,
                        order.order_items.len()
                    ),
                )
                .await;
                order
            }
            Err(e) => {
                return self
                    .fail(log, steps::STEP_ORDER_FETCH, &request, e.into(), run_start)
                    .await;
            }
        };

        // 4. Mapping resolution
        log.info(steps::STEP_MAPPING, "resolving line items to SKUs")
            .await;
        let Some(first_line) = order.order_items.first() else {
            return self
                .fail(
                    log,
                    steps::STEP_MAPPING,
                    &request,
                    IntegrationError::NoValidItems,
                    run_start,
                )
                .await;
        };

        let part_number = match self.marketplace.fetch_item(&first_line.item.id).await {
            Ok(item) => item.part_number().unwrap_or_default().to_string(),
            Err(e) => {
                return self
                    .fail(log, steps::STEP_MAPPING, &request, e.into(), run_start)
                    .await;
            }
        };

        let company = match mapping::resolve_company(
            &self.mappings,
            &account.mapping_schema,
            &first_line.item.id,
            &part_number,
        )
        .await
        {
            Ok(Some(company)) => company,
            Ok(None) => {
                return self
                    .fail(
                        log,
                        steps::STEP_MAPPING,
                        &request,
                        IntegrationError::NoValidItems,
                        run_start,
                    )
                    .await;
            }
            Err(e) => {
                return self
                    .fail(log, steps::STEP_MAPPING, &request, e.into(), run_start)
                    .await;
            }
        };

        let line_items: Vec<mapping::LineItem> = order
            .order_items
            .iter()
            .map(|line| mapping::LineItem {
                item_id: line.item.id.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();

        let resolution =
            match mapping::resolve_items(&self.mappings, company, &line_items).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    return self
                        .fail(log, steps::STEP_MAPPING, &request, e.into(), run_start)
                        .await;
                }
            };

        for item_id in &resolution.skipped {
            log.warning(
                steps::STEP_MAPPING,
                IntegrationError::MappingNotFound(item_id.clone()).to_string(),
            )
            .await;
        }
        if resolution.items.is_empty() {
            return self
                .fail(
                    log,
                    steps::STEP_MAPPING,
                    &request,
                    IntegrationError::NoValidItems,
                    run_start,
                )
                .await;
        }
        log.success(
            steps::STEP_MAPPING,
            format!(
                "{} of {} item(s) resolved via company {} (supplier {})",
                resolution.items.len(),
                order.order_items.len(),
                resolution.company.company_code,
                resolution.company.supplier_code
            ),
        )
        .await;

        // 5. Customer registration
        log.info(steps::STEP_CUSTOMER, "acquiring ERP session").await;
        let erp_token = match self.erp.fetch_token(&resolution.company.company_code).await {
            Ok(token) => token,
            Err(e) => {
                return self
                    .fail(log, steps::STEP_CUSTOMER, &request, e.into(), run_start)
                    .await;
            }
        };

        let billing =
            match resolve_billing_info(&self.marketplace, request.order_id.as_str(), &token).await
            {
                Ok(response) => response.billing_info,
                Err(e) => {
                    return self
                        .fail(log, steps::STEP_CUSTOMER, &request, e.into(), run_start)
                        .await;
                }
            };

        let customer = customer_from_billing(&billing);
        let customer_name = customer.name.clone();
        log.info(
            steps::STEP_CUSTOMER,
            format!("registering customer {customer_name} ({})", customer.document),
        )
        .await;
        match self.erp.register_customer(&erp_token, &customer).await {
            Ok(()) => {
                log.success(
                    steps::STEP_CUSTOMER,
                    format!("customer {customer_name} registered"),
                )
                .await;
            }
            Err(e) => {
                return self
                    .fail(log, steps::STEP_CUSTOMER, &request, e.into(), run_start)
                    .await;
            }
        }

        // 6. Address registration
        let address = address_for_customer(&customer.customer_code);
        log.info(
            steps::STEP_ADDRESS,
            format!("registering address {}", address_summary(&address)),
        )
        .await;
        match self.erp.register_address(&erp_token, &address).await {
            Ok(()) => {
                log.success(steps::STEP_ADDRESS, "address registered").await;
            }
            Err(e) => {
                return self
                    .fail(log, steps::STEP_ADDRESS, &request, e.into(), run_start)
                    .await;
            }
        }

        // 7. Initial ledger write; the unique insert closes the race the
        // read-check in step 1 cannot.
        log.info(
            steps::STEP_LEDGER_INITIAL_WRITE,
            "recording the order in the ledger",
        )
        .await;
        let record = NewLedgerRecord {
            order_id: request.order_id.clone(),
            account_token_id: token.user_id.clone(),
            account_name: account_label.clone(),
            marketplace_name: request.marketplace.clone(),
            shipping_id: order.shipping_id().to_string(),
        };
        match self.ledger.insert_initial(record).await {
            Ok(()) => {
                log.success(steps::STEP_LEDGER_INITIAL_WRITE, "ledger record created")
                    .await;
            }
            Err(LedgerError::DuplicateOrder(_)) => {
                log.warning(
                    steps::STEP_LEDGER_INITIAL_WRITE,
                    format!(
                        "a concurrent run already recorded order {}; treating as already processed",
                        request.order_id
                    ),
                )
                .await;
                return Self::already_processed_result(log, run_start);
            }
            Err(e) => {
                return self
                    .fail(
                        log,
                        steps::STEP_LEDGER_INITIAL_WRITE,
                        &request,
                        IntegrationError::LedgerWriteFailed(e.to_string()),
                        run_start,
                    )
                    .await;
            }
        }

        // 8. Order submission
        let submission = build_submission(&order, &customer.customer_code, &resolution);
        log.info(
            steps::STEP_ORDER_SUBMIT,
            format!("submitting order with {} item(s)", submission.items.len()),
        )
        .await;
        let document = match self.erp.submit_order(&erp_token, &submission).await {
            Ok(document) => {
                log.success(
                    steps::STEP_ORDER_SUBMIT,
                    format!("order accepted as document {document}"),
                )
                .await;
                document
            }
            Err(e) => {
                return self
                    .fail(log, steps::STEP_ORDER_SUBMIT, &request, e.into(), run_start)
                    .await;
            }
        };

        // 9. Final ledger write. A failure here is logged and notified but
        // the ERP order just created stays committed.
        log.info(steps::STEP_LEDGER_FINAL_WRITE, "recording final status")
            .await;
        if let Err(e) = self
            .ledger
            .mark_submitted(&token.user_id, &request.order_id, document.as_str())
            .await
        {
            return self
                .fail(
                    log,
                    steps::STEP_LEDGER_FINAL_WRITE,
                    &request,
                    IntegrationError::LedgerWriteFailed(e.to_string()),
                    run_start,
                )
                .await;
        }
        log.success(
            steps::STEP_LEDGER_FINAL_WRITE,
            format!(
                "integration complete: order {} recorded as document {document}",
                request.order_id
            ),
        )
        .await;

        let message = format!(
            "NEW ORDER INTEGRATED: {account_label} ({})\n\
             Order: {}\n\
             Customer: {customer_name}\n\
             Address: {}\n\
             Items: {} | Total: {:.2}\n\
             Document: {document}",
            request.marketplace,
            request.order_id,
            address_summary(&address),
            order.order_items.len(),
            order.total_value(),
        );
        self.notifier.notify(&message).await;

        let duration = run_start.elapsed().as_secs_f64();
        metrics::histogram!("integration_duration_seconds").record(duration);
        metrics::counter!("integration_completed").increment(1);
        tracing::info!(order_id = %request.order_id, %document, duration, "integration completed");

        SagaResult {
            total_processed: 1,
            success_count: 1,
            error_count: 0,
            results: vec![OrderResult {
                order_id: request.order_id.to_string(),
                document_number: document.to_string(),
                status: steps::STATUS_SUCCESS.to_string(),
            }],
            logs: log.into_entries(),
        }
    }

    /// Terminates a run at the failing step: exactly one error entry naming
    /// the step, the failure notification, and a failed result.
    async fn fail(
        &self,
        mut log: StepRecorder,
        step: &str,
        request: &IntegrationRequest,
        error: IntegrationError,
        run_start: std::time::Instant,
    ) -> SagaResult {
        log.error(step, error.to_string()).await;

        let message = format!(
            "INTEGRATION FAILED: {} ({})\n\
             Order {} failed at step {step}: {error}\n\
             Processed: 1 | Successes: 0 | Errors: 1",
            request.account.to_uppercase(),
            request.marketplace,
            request.order_id,
        );
        self.notifier.notify(&message).await;

        metrics::histogram!("integration_duration_seconds")
            .record(run_start.elapsed().as_secs_f64());
        metrics::counter!("integration_failed").increment(1);
        tracing::warn!(step, order_id = %request.order_id, %error, "integration failed");

        SagaResult {
            total_processed: 1,
            success_count: 0,
            error_count: 1,
            results: Vec::new(),
            logs: log.into_entries(),
        }
    }

    /// Early exit for an order another run already owns. Not a failure of
    /// this saga and not notified; the warning entry is already emitted.
    fn already_processed_result(log: StepRecorder, run_start: std::time::Instant) -> SagaResult {
        metrics::histogram!("integration_duration_seconds")
            .record(run_start.elapsed().as_secs_f64());
        SagaResult {
            total_processed: 0,
            success_count: 0,
            error_count: 1,
            results: Vec::new(),
            logs: log.into_entries(),
        }
    }
}

/// Builds the canonical ERP submission payload.
fn build_submission(
    order: &Order,
    customer_code: &str,
    resolution: &mapping::Resolution,
) -> OrderSubmission {
    OrderSubmission {
        web_order_id: WEB_ORDER_ID,
        customer_code: customer_code.to_string(),
        address_type: 4,
        carrier_code: 0,
        freight_total: 0.0,
        intermediary_tax_id: INTERMEDIARY_TAX_ID.to_string(),
        intermediary_name: INTERMEDIARY_NAME.to_string(),
        buyer_label: format!("{BUYER_LABEL_PREFIX}{}", resolution.company.company_code),
        items: resolution
            .items
            .iter()
            .map(|item| OrderItemPayload {
                sku: item.sku.clone(),
                supplier_code: item.supplier_code.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
            })
            .collect(),
        payments: vec![PaymentPayload {
            brand_code: PAYMENT_BRAND.to_string(),
            card_kind: PAYMENT_KIND.to_string(),
            payment_date: order.date_created.clone(),
            card_number: PAYMENT_CARD.to_string(),
            authorization_number: PAYMENT_AUTHORIZATION.to_string(),
            installments: 1,
        }],
    }
}
