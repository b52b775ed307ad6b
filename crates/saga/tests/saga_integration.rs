//! Integration tests for the order-integration saga.

use common::{AccountRegistry, OrderId, ProcessId};
use erp::InMemoryErpGateway;
use ledger::{InMemoryLedgerStore, LedgerStore, NewLedgerRecord, OrderStatus};
use mapping::{InMemoryMappingStore, MappingEntry};
use marketplace::{InMemoryMarketplaceApi, Order, StaticTokenProvider};
use saga::{
    IntegrationRequest, IntegrationSaga, LogHub, LogLevel, RecordingNotifier, StepLogEntry,
};

const ORDER_ID: &str = "2000012345678";
const SHIPPING_ID: &str = "44331122";

type TestSaga = IntegrationSaga<
    InMemoryLedgerStore,
    StaticTokenProvider,
    InMemoryMarketplaceApi,
    InMemoryMappingStore,
    InMemoryErpGateway,
    RecordingNotifier,
>;

struct TestHarness {
    saga: TestSaga,
    ledger: InMemoryLedgerStore,
    tokens: StaticTokenProvider,
    marketplace: InMemoryMarketplaceApi,
    mappings: InMemoryMappingStore,
    erp: InMemoryErpGateway,
    notifier: RecordingNotifier,
    hub: LogHub,
}

impl TestHarness {
    fn new() -> Self {
        let ledger = InMemoryLedgerStore::new();
        let tokens = StaticTokenProvider::new();
        let marketplace = InMemoryMarketplaceApi::new();
        let mappings = InMemoryMappingStore::new();
        let erp = InMemoryErpGateway::new();
        let notifier = RecordingNotifier::new();
        let hub = LogHub::new();

        let saga = IntegrationSaga::new(
            ledger.clone(),
            tokens.clone(),
            marketplace.clone(),
            mappings.clone(),
            erp.clone(),
            notifier.clone(),
            AccountRegistry::with_defaults(),
            hub.clone(),
        );

        Self {
            saga,
            ledger,
            tokens,
            marketplace,
            mappings,
            erp,
            notifier,
            hub,
        }
    }

    /// Seeds the happy-path scenario: account `psa`, one item `MLB111`
    /// mapped to SKU `ABC123` under company 17.
    async fn seed_defaults(&self) {
        self.tokens
            .set_token("psa", "APP_USR-6617296886-080114-998877")
            .await;
        self.marketplace.insert_order(order_with_items(
            ORDER_ID,
            &[("MLB111", 150.0, 2)],
        )).await;
        self.marketplace.insert_item(item("MLB111", "XJ900")).await;
        self.marketplace
            .insert_billing(ORDER_ID, individual_billing())
            .await;
        self.mappings
            .insert("psa", entry("MLB111", "ABC123", "17"))
            .await;
        self.mappings
            .insert("principal", entry("MLB111", "ABC123", "17"))
            .await;
    }

    fn request(&self) -> IntegrationRequest {
        IntegrationRequest {
            account: "psa".to_string(),
            marketplace: "Mercado Livre".to_string(),
            order_id: OrderId::new(ORDER_ID),
        }
    }
}

fn order_with_items(id: &str, items: &[(&str, f64, u32)]) -> Order {
    let items_json: Vec<String> = items
        .iter()
        .map(|(item_id, price, qty)| {
            format!(
                r#"{{"item": {{"id": "{item_id}", "title": "Part"}}, "unit_price": {price}, "quantity": {qty}}}"#
            )
        })
        .collect();
    serde_json::from_str(&format!(
        r#"{{"id": "{id}", "date_created": "2025-08-01T10:00:00.000-03:00",
             "order_items": [{}], "shipping": {{"id": {SHIPPING_ID}}}}}"#,
        items_json.join(",")
    ))
    .unwrap()
}

fn item(id: &str, part_number: &str) -> marketplace::Item {
    serde_json::from_str(&format!(
        r#"{{"id": "{id}", "title": "Part",
             "attributes": [{{"name": "MPN", "value_name": "{part_number}"}}]}}"#
    ))
    .unwrap()
}

fn individual_billing() -> marketplace::BillingInfoResponse {
    serde_json::from_str(
        r#"{"billing_info": {"doc_type": "CPF", "doc_number": "09059264630",
            "additional_info": {"FIRST_NAME": "Maria", "LAST_NAME": "Silva"}}}"#,
    )
    .unwrap()
}

fn entry(item_id: &str, sku: &str, company: &str) -> MappingEntry {
    MappingEntry {
        item_id: item_id.to_string(),
        sku: sku.to_string(),
        company_code: company.to_string(),
    }
}

/// Step names in emission order, consecutive duplicates collapsed.
fn step_sequence(logs: &[StepLogEntry]) -> Vec<String> {
    let mut steps: Vec<String> = Vec::new();
    for entry in logs {
        if steps.last().map(String::as_str) != Some(entry.step.as_str()) {
            steps.push(entry.step.clone());
        }
    }
    steps
}

fn error_entries(logs: &[StepLogEntry]) -> Vec<&StepLogEntry> {
    logs.iter().filter(|e| e.level == LogLevel::Error).collect()
}

#[tokio::test]
async fn happy_path_runs_all_steps_in_order() {
    let harness = TestHarness::new();
    harness.seed_defaults().await;

    let result = harness.saga.execute(harness.request()).await;

    assert_eq!(result.total_processed, 1);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.error_count, 0);
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.results[0].order_id, ORDER_ID);
    assert_eq!(result.results[0].document_number, "770001");
    assert_eq!(result.results[0].status, "sucesso");

    assert_eq!(
        step_sequence(&result.logs),
        vec![
            "idempotency-check",
            "token",
            "order-fetch",
            "mapping",
            "customer",
            "address",
            "ledger-initial-write",
            "order-submit",
            "ledger-final-write",
        ]
    );
    assert!(error_entries(&result.logs).is_empty());

    // Ledger ends at Submitted with the document recorded.
    let record = harness.ledger.get(&OrderId::new(ORDER_ID)).await.unwrap();
    assert_eq!(record.status, OrderStatus::Submitted);
    assert_eq!(record.document_number.as_deref(), Some("770001"));
    assert_eq!(record.account_token_id, "998877");
    assert_eq!(record.account_name, "PSA");
    assert_eq!(record.shipping_id, SHIPPING_ID);

    // The submission used the resolved SKU and supplier pair.
    let submission = harness.erp.last_order().await.unwrap();
    assert_eq!(submission.buyer_label, "ECOMML17");
    assert_eq!(submission.customer_code, "09059264630");
    assert_eq!(submission.items.len(), 1);
    assert_eq!(submission.items[0].sku, "ABC123");
    assert_eq!(submission.items[0].supplier_code, "7");
    assert_eq!(submission.items[0].quantity, 2);
    assert_eq!(submission.freight_total, 0.0);
    assert_eq!(submission.payments.len(), 1);

    // One success notification mentioning the document.
    let messages = harness.notifier.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("770001"));
    assert!(messages[0].contains("MARIA SILVA"));
}

#[tokio::test]
async fn already_processed_performs_zero_external_calls() {
    let harness = TestHarness::new();
    harness.seed_defaults().await;
    harness
        .ledger
        .insert_initial(NewLedgerRecord {
            order_id: OrderId::new(ORDER_ID),
            account_token_id: "998877".to_string(),
            account_name: "PSA".to_string(),
            marketplace_name: "Mercado Livre".to_string(),
            shipping_id: SHIPPING_ID.to_string(),
        })
        .await
        .unwrap();

    let result = harness.saga.execute(harness.request()).await;

    assert_eq!(result.success_count, 0);
    assert_eq!(result.error_count, 1);
    assert!(result.results.is_empty());

    // The warning is emitted and nothing downstream ran.
    assert!(result
        .logs
        .iter()
        .any(|e| e.level == LogLevel::Warning && e.step == "idempotency-check"));
    assert!(error_entries(&result.logs).is_empty());
    assert_eq!(harness.marketplace.order_fetch_count().await, 0);
    assert_eq!(harness.erp.customer_count().await, 0);
    assert_eq!(harness.erp.order_count().await, 0);
    assert!(harness.notifier.messages().await.is_empty());
}

#[tokio::test]
async fn pack_fallback_matches_direct_submission() {
    let direct = TestHarness::new();
    direct.seed_defaults().await;
    let direct_result = direct.saga.execute(direct.request()).await;
    assert_eq!(direct_result.success_count, 1);

    // Same order reachable only through a pack id.
    let packed = TestHarness::new();
    packed.tokens.set_token("psa", "APP_USR-1-998877").await;
    packed
        .marketplace
        .insert_order(order_with_items(ORDER_ID, &[("MLB111", 150.0, 2)]))
        .await;
    packed.marketplace.insert_item(item("MLB111", "XJ900")).await;
    packed
        .marketplace
        .insert_billing(ORDER_ID, individual_billing())
        .await;
    packed
        .marketplace
        .insert_pack(
            "3000000000001",
            serde_json::from_str(&format!(r#"{{"orders": [{{"id": {ORDER_ID}}}]}}"#)).unwrap(),
        )
        .await;
    packed
        .mappings
        .insert("psa", entry("MLB111", "ABC123", "17"))
        .await;
    packed
        .mappings
        .insert("principal", entry("MLB111", "ABC123", "17"))
        .await;

    let packed_result = packed
        .saga
        .execute(IntegrationRequest {
            account: "psa".to_string(),
            marketplace: "Mercado Livre".to_string(),
            order_id: OrderId::new("3000000000001"),
        })
        .await;
    assert_eq!(packed_result.success_count, 1);

    // Both paths submit the identical payload.
    let direct_submission = direct.erp.last_order().await.unwrap();
    let packed_submission = packed.erp.last_order().await.unwrap();
    assert_eq!(direct_submission.items[0].sku, packed_submission.items[0].sku);
    assert_eq!(direct_submission.buyer_label, packed_submission.buyer_label);
    assert_eq!(
        direct_submission.customer_code,
        packed_submission.customer_code
    );
}

#[tokio::test]
async fn unmapped_first_item_resolves_remaining_items() {
    let harness = TestHarness::new();
    harness.tokens.set_token("psa", "APP_USR-1-998877").await;
    harness
        .marketplace
        .insert_order(order_with_items(
            ORDER_ID,
            &[("MLB000", 10.0, 1), ("MLB111", 150.0, 2)],
        ))
        .await;
    harness.marketplace.insert_item(item("MLB000", "XJ900")).await;
    harness
        .marketplace
        .insert_billing(ORDER_ID, individual_billing())
        .await;
    // Only the second item maps, and only in the fallback company's schema.
    harness
        .mappings
        .insert("principal", entry("MLB111", "ABC123", "17"))
        .await;

    let result = harness.saga.execute(harness.request()).await;

    assert_eq!(result.success_count, 1);
    assert!(result
        .logs
        .iter()
        .any(|e| e.level == LogLevel::Warning && e.message.contains("MLB000")));

    let submission = harness.erp.last_order().await.unwrap();
    assert_eq!(submission.items.len(), 1);
    assert_eq!(submission.items[0].sku, "ABC123");
    // Fallback company buys through supplier 8.
    assert_eq!(submission.items[0].supplier_code, "8");
}

#[tokio::test]
async fn no_valid_items_fails_before_any_erp_write() {
    let harness = TestHarness::new();
    harness.tokens.set_token("psa", "APP_USR-1-998877").await;
    harness
        .marketplace
        .insert_order(order_with_items(ORDER_ID, &[("MLB000", 10.0, 1)]))
        .await;
    harness.marketplace.insert_item(item("MLB000", "XJ900")).await;
    harness
        .marketplace
        .insert_billing(ORDER_ID, individual_billing())
        .await;

    let result = harness.saga.execute(harness.request()).await;

    assert_eq!(result.success_count, 0);
    assert_eq!(result.error_count, 1);

    let errors = error_entries(&result.logs);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].step, "mapping");

    assert_eq!(harness.erp.customer_count().await, 0);
    assert_eq!(harness.erp.address_count().await, 0);
    assert_eq!(harness.erp.order_count().await, 0);
    assert_eq!(harness.ledger.record_count().await, 0);

    let messages = harness.notifier.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("failed at step mapping"));
}

#[tokio::test]
async fn customer_rejection_halts_at_customer_step() {
    let harness = TestHarness::new();
    harness.seed_defaults().await;
    harness.erp.set_fail_on_customer(true).await;

    let result = harness.saga.execute(harness.request()).await;

    assert_eq!(result.error_count, 1);
    let errors = error_entries(&result.logs);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].step, "customer");

    // Nothing after the failing step ran.
    assert_eq!(harness.erp.address_count().await, 0);
    assert_eq!(harness.erp.order_count().await, 0);
    assert_eq!(harness.ledger.record_count().await, 0);
}

#[tokio::test]
async fn address_rejection_leaves_customer_registered() {
    let harness = TestHarness::new();
    harness.seed_defaults().await;
    harness.erp.set_fail_on_address(true).await;

    let result = harness.saga.execute(harness.request()).await;

    assert_eq!(result.error_count, 1);
    let errors = error_entries(&result.logs);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].step, "address");

    // Forward-only: the customer upsert is not compensated.
    assert_eq!(harness.erp.customer_count().await, 1);
    assert_eq!(harness.erp.order_count().await, 0);
}

#[tokio::test]
async fn submit_rejection_keeps_registrations_and_initial_record() {
    let harness = TestHarness::new();
    harness.seed_defaults().await;
    harness.erp.set_fail_on_submit(true).await;

    let result = harness.saga.execute(harness.request()).await;

    assert_eq!(result.error_count, 1);
    let errors = error_entries(&result.logs);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].step, "order-submit");

    // Forward-only: registrations and the initial ledger row stand.
    assert_eq!(harness.erp.customer_count().await, 1);
    assert_eq!(harness.erp.address_count().await, 1);
    let record = harness.ledger.get(&OrderId::new(ORDER_ID)).await.unwrap();
    assert_eq!(record.status, OrderStatus::New);
    assert!(record.document_number.is_none());
}

#[tokio::test]
async fn final_ledger_write_failure_keeps_erp_order() {
    let harness = TestHarness::new();
    harness.seed_defaults().await;
    harness.ledger.set_fail_on_mark_submitted(true).await;

    let result = harness.saga.execute(harness.request()).await;

    assert_eq!(result.error_count, 1);
    let errors = error_entries(&result.logs);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].step, "ledger-final-write");

    // The ERP order already created is not undone.
    assert_eq!(harness.erp.order_count().await, 1);
    let messages = harness.notifier.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("ledger-final-write"));
}

#[tokio::test]
async fn concurrent_duplicate_submits_exactly_once() {
    let harness = TestHarness::new();
    harness.seed_defaults().await;

    let request = harness.request();
    let (first, second) =
        tokio::join!(harness.saga.execute(request.clone()), harness.saga.execute(request));

    let successes = first.success_count + second.success_count;
    assert_eq!(successes, 1);
    assert_eq!(first.error_count + second.error_count, 1);

    // Exactly one run won the ledger insert and submitted the order.
    assert_eq!(harness.ledger.record_count().await, 1);
    assert_eq!(harness.erp.order_count().await, 1);
}

#[tokio::test]
async fn retained_log_is_pullable_after_the_run() {
    let harness = TestHarness::new();
    harness.seed_defaults().await;

    let result = harness.saga.execute(harness.request()).await;

    let retained = harness.hub.snapshot(ProcessId::from(ORDER_ID)).await;
    assert_eq!(retained.len(), result.logs.len());
    assert_eq!(retained[0].message, result.logs[0].message);
    assert_eq!(retained.len(), harness.saga.hub().snapshot(ProcessId::from(ORDER_ID)).await.len());
}
