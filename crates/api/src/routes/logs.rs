//! Live step-log WebSocket stream.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use erp::{ErpGateway, InvoiceReportStore};
use futures_util::{SinkExt, StreamExt};
use ledger::LedgerStore;
use mapping::MappingStore;
use marketplace::{MarketplaceApi, TokenProvider};
use saga::{LogHub, Notifier};

use crate::routes::integrations::AppState;

/// GET /ws/logs — upgrades to a WebSocket pushing every step log entry in
/// emission order. A client that stops reading is evicted by the hub.
pub async fn stream<L, T, M, S, E, R, N>(
    State(state): State<Arc<AppState<L, T, M, S, E, R, N>>>,
    ws: WebSocketUpgrade,
) -> Response
where
    L: LedgerStore + 'static,
    T: TokenProvider + 'static,
    M: MarketplaceApi + 'static,
    S: MappingStore + 'static,
    E: ErpGateway + 'static,
    R: InvoiceReportStore + 'static,
    N: Notifier + 'static,
{
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: LogHub) {
    let Some(subscription) = hub.subscribe().await else {
        return;
    };
    let subscriber_id = subscription.id;
    let mut entries = subscription.receiver;
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        // The channel closes when the hub evicts this subscriber.
        while let Some(entry) = entries.recv().await {
            let Ok(text) = serde_json::to_string(&entry) else {
                continue;
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unsubscribe(subscriber_id).await;
    tracing::debug!("log stream client disconnected");
}
