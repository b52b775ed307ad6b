//! PostgreSQL integration tests.
//!
//! These tests use a shared PostgreSQL container and therefore need a local
//! Docker daemon. They are ignored by default; run with:
//!
//! ```bash
//! cargo test -p ledger --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use common::OrderId;
use ledger::{LedgerError, LedgerStore, NewLedgerRecord, OrderStatus, PostgresLedgerStore};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!("../../../migrations/001_create_sales_ledger.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared table
async fn get_test_store() -> PostgresLedgerStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE sales_ledger")
        .execute(&pool)
        .await
        .unwrap();

    PostgresLedgerStore::new(pool)
}

fn new_record(order_id: &str) -> NewLedgerRecord {
    NewLedgerRecord {
        order_id: OrderId::new(order_id),
        account_token_id: "123456".to_string(),
        account_name: "PSA".to_string(),
        marketplace_name: "Mercado Livre".to_string(),
        shipping_id: "44331122".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn insert_and_find_roundtrip() {
    let store = get_test_store().await;

    store.insert_initial(new_record("2000012345678")).await.unwrap();

    let record = store
        .find(&OrderId::new("2000012345678"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, OrderStatus::New);
    assert_eq!(record.account_token_id, "123456");
    assert!(record.document_number.is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn unique_constraint_rejects_duplicate_order() {
    let store = get_test_store().await;

    store.insert_initial(new_record("2000012345678")).await.unwrap();
    let result = store.insert_initial(new_record("2000012345678")).await;

    assert!(matches!(result, Err(LedgerError::DuplicateOrder(_))));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn concurrent_inserts_admit_exactly_one() {
    let store = get_test_store().await;

    let a = store.insert_initial(new_record("2000099999999"));
    let b = store.insert_initial(new_record("2000099999999"));
    let (ra, rb) = tokio::join!(a, b);

    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let duplicates = [&ra, &rb]
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::DuplicateOrder(_))))
        .count();
    assert_eq!(duplicates, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn submit_then_invoice_lifecycle() {
    let store = get_test_store().await;
    let order_id = OrderId::new("2000012345678");

    store.insert_initial(new_record("2000012345678")).await.unwrap();
    store
        .mark_submitted("123456", &order_id, "777001")
        .await
        .unwrap();

    let submitted = store.find_submitted(&order_id).await.unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].document_number.as_deref(), Some("777001"));

    store
        .record_invoice("777001", "55001", "<nfe/>", OrderStatus::Completed)
        .await
        .unwrap();

    let record = store.find(&order_id).await.unwrap().unwrap();
    assert_eq!(record.status, OrderStatus::Completed);
    assert_eq!(record.invoice_number.as_deref(), Some("55001"));
    assert!(record.updated_at.is_some());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn mark_submitted_unknown_order_fails() {
    let store = get_test_store().await;
    let result = store
        .mark_submitted("123456", &OrderId::new("404404404"), "777001")
        .await;
    assert!(matches!(result, Err(LedgerError::RecordNotFound(_))));
}
