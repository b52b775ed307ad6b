//! Saga invocation and retained-log endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{OrderId, ProcessId};
use erp::{ErpGateway, InvoiceReportStore};
use ledger::LedgerStore;
use mapping::MappingStore;
use marketplace::{MarketplaceApi, TokenProvider};
use saga::{
    IntegrationRequest, IntegrationSaga, InvoiceSync, InvoiceSyncResult, LogHub, Notifier,
    SagaResult, StepLogEntry,
};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<L, T, M, S, E, R, N>
where
    L: LedgerStore,
    T: TokenProvider,
    M: MarketplaceApi,
    S: MappingStore,
    E: ErpGateway,
    R: InvoiceReportStore,
    N: Notifier,
{
    pub saga: IntegrationSaga<L, T, M, S, E, N>,
    pub invoice_sync: InvoiceSync<L, T, M, R, N>,
    pub hub: LogHub,
}

/// POST /integrations — runs the integration saga for one order.
///
/// Always answers 200: failures are encoded in the result's counters and
/// step log, matching the saga invocation contract.
#[tracing::instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn integrate<L, T, M, S, E, R, N>(
    State(state): State<Arc<AppState<L, T, M, S, E, R, N>>>,
    Json(request): Json<IntegrationRequest>,
) -> Result<Json<SagaResult>, ApiError>
where
    L: LedgerStore + 'static,
    T: TokenProvider + 'static,
    M: MarketplaceApi + 'static,
    S: MappingStore + 'static,
    E: ErpGateway + 'static,
    R: InvoiceReportStore + 'static,
    N: Notifier + 'static,
{
    if request.order_id.as_str().is_empty() {
        return Err(ApiError::BadRequest("order_id must not be empty".to_string()));
    }
    if request.account.is_empty() {
        return Err(ApiError::BadRequest("account must not be empty".to_string()));
    }

    Ok(Json(state.saga.execute(request).await))
}

/// POST /integrations/{order_id}/invoice-sync — runs the invoice-sync
/// companion for an already-submitted order.
#[tracing::instrument(skip(state))]
pub async fn invoice_sync<L, T, M, S, E, R, N>(
    State(state): State<Arc<AppState<L, T, M, S, E, R, N>>>,
    Path(order_id): Path<String>,
) -> Result<Json<InvoiceSyncResult>, ApiError>
where
    L: LedgerStore + 'static,
    T: TokenProvider + 'static,
    M: MarketplaceApi + 'static,
    S: MappingStore + 'static,
    E: ErpGateway + 'static,
    R: InvoiceReportStore + 'static,
    N: Notifier + 'static,
{
    if order_id.is_empty() {
        return Err(ApiError::BadRequest("order_id must not be empty".to_string()));
    }

    Ok(Json(state.invoice_sync.run(&OrderId::new(order_id)).await))
}

/// GET /integrations/logs/{process_id} — returns the retained step log for
/// a past run, in emission order. Unknown ids yield an empty sequence.
pub async fn retained_logs<L, T, M, S, E, R, N>(
    State(state): State<Arc<AppState<L, T, M, S, E, R, N>>>,
    Path(process_id): Path<String>,
) -> Json<Vec<StepLogEntry>>
where
    L: LedgerStore + 'static,
    T: TokenProvider + 'static,
    M: MarketplaceApi + 'static,
    S: MappingStore + 'static,
    E: ErpGateway + 'static,
    R: InvoiceReportStore + 'static,
    N: Notifier + 'static,
{
    Json(state.hub.snapshot(ProcessId::from(process_id)).await)
}
