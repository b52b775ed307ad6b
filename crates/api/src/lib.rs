//! HTTP API server for the order-integration service.
//!
//! Exposes the saga invocation contract, the retained-log pull endpoint and
//! the live log WebSocket, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use common::AccountRegistry;
use erp::{ErpCredentials, ErpGateway, HttpErpGateway, InvoiceReportStore, SqlInvoiceReportStore};
use ledger::{LedgerStore, PostgresLedgerStore};
use mapping::{MappingStore, PostgresMappingStore};
use marketplace::{HttpMarketplaceApi, HttpTokenProvider, MarketplaceApi, TokenProvider};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{IntegrationSaga, InvoiceSync, LogHub, Notifier, WebhookNotifier};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::integrations::AppState;

/// Outbound calls carry a bounded timeout; upstreams that hang must fail
/// the step, not the server.
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

/// State assembled for the production binary.
pub type HttpAppState = AppState<
    PostgresLedgerStore,
    HttpTokenProvider,
    HttpMarketplaceApi,
    PostgresMappingStore,
    HttpErpGateway,
    SqlInvoiceReportStore,
    WebhookNotifier,
>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, T, M, S, E, R, N>(
    state: Arc<AppState<L, T, M, S, E, R, N>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    L: LedgerStore + 'static,
    T: TokenProvider + 'static,
    M: MarketplaceApi + 'static,
    S: MappingStore + 'static,
    E: ErpGateway + 'static,
    R: InvoiceReportStore + 'static,
    N: Notifier + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/integrations",
            post(routes::integrations::integrate::<L, T, M, S, E, R, N>),
        )
        .route(
            "/integrations/{order_id}/invoice-sync",
            post(routes::integrations::invoice_sync::<L, T, M, S, E, R, N>),
        )
        .route(
            "/integrations/logs/{process_id}",
            get(routes::integrations::retained_logs::<L, T, M, S, E, R, N>),
        )
        .route("/ws/logs", get(routes::logs::stream::<L, T, M, S, E, R, N>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Assembles the production state from configuration: Postgres-backed
/// stores, reqwest-backed clients and the webhook notifier.
///
/// Must run inside a tokio runtime (the log hub spawns its owner task).
/// Pools connect lazily; ledger migrations are attempted and a failure is
/// logged rather than fatal, so the server can boot before its database.
pub async fn create_state(config: &Config) -> Result<Arc<HttpAppState>, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .timeout(OUTBOUND_TIMEOUT)
        .build()?;

    let pool = PgPoolOptions::new().connect_lazy(&config.database_url)?;
    let reporting_pool = if config.reporting_database_url == config.database_url {
        pool.clone()
    } else {
        PgPoolOptions::new().connect_lazy(&config.reporting_database_url)?
    };

    let ledger = PostgresLedgerStore::new(pool.clone());
    if let Err(e) = ledger.run_migrations().await {
        tracing::warn!(error = %e, "ledger migrations not applied");
    }

    let tokens = HttpTokenProvider::new(client.clone(), config.token_base_url.clone());
    let marketplace = HttpMarketplaceApi::new(client.clone(), config.marketplace_base_url.clone());
    let mappings = PostgresMappingStore::new(pool);
    let erp = HttpErpGateway::new(
        client.clone(),
        config.erp_base_url.clone(),
        ErpCredentials {
            user_prefix: config.erp_user_prefix.clone(),
            shared_secret: config.erp_shared_secret.clone(),
            package: config.erp_package.clone(),
        },
    );
    let reports = SqlInvoiceReportStore::new(reporting_pool);
    let notifier = WebhookNotifier::new(
        client,
        config.notifier_webhook_url.clone(),
        config.notifier_channel_id.clone(),
    );
    let accounts = AccountRegistry::with_defaults();
    let hub = LogHub::new();

    let saga = IntegrationSaga::new(
        ledger.clone(),
        tokens.clone(),
        marketplace.clone(),
        mappings.clone(),
        erp.clone(),
        notifier.clone(),
        accounts.clone(),
        hub.clone(),
    );
    let invoice_sync = InvoiceSync::new(
        ledger,
        tokens,
        marketplace,
        reports,
        notifier,
        accounts,
        hub.clone(),
    );

    Ok(Arc::new(AppState {
        saga,
        invoice_sync,
        hub,
    }))
}
