//! Marketplace API client.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::token::AccessToken;
use crate::types::{BillingInfoResponse, Item, Order, Pack, Shipment};
use crate::{MarketplaceError, Result};

/// Whether an invoice-upload response status counts as accepted.
///
/// The upload endpoint answers 406 for a document it has in fact accepted;
/// a documented quirk of the upstream API that callers must not treat as a
/// failure.
pub fn invoice_upload_accepted(status: u16) -> bool {
    (200..300).contains(&status) || status == 406
}

/// Operations against the marketplace API.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Fetches an order directly by id. A 404 maps to
    /// [`MarketplaceError::OrderNotFound`] so callers can run the pack
    /// fallback.
    async fn fetch_order(&self, order_id: &str, token: &AccessToken) -> Result<Order>;

    /// Fetches a grouped shipment ("pack"). Returns `None` when the id is
    /// not a pack either.
    async fn fetch_pack(&self, pack_id: &str, token: &AccessToken) -> Result<Option<Pack>>;

    /// Fetches billing info for an order. Returns `None` on a non-2xx
    /// answer so callers can run the pack fallback.
    async fn billing_info(
        &self,
        order_id: &str,
        token: &AccessToken,
    ) -> Result<Option<BillingInfoResponse>>;

    /// Fetches a catalog item with its attributes.
    async fn fetch_item(&self, item_id: &str) -> Result<Item>;

    /// Fetches a shipment's status.
    async fn shipment(&self, shipment_id: &str, token: &AccessToken) -> Result<Shipment>;

    /// Uploads an invoice document for a shipment. Success includes the
    /// upstream's 406 quirk (see [`invoice_upload_accepted`]).
    async fn upload_invoice(
        &self,
        shipment_id: &str,
        document: &str,
        token: &AccessToken,
    ) -> Result<()>;
}

/// Resolves an order, falling back to the pack lookup on a direct miss.
///
/// The fallback re-enters [`MarketplaceApi::fetch_order`] with the pack's
/// first sub-order id, so both paths share one parsing path.
pub async fn resolve_order<A: MarketplaceApi + ?Sized>(
    api: &A,
    order_id: &str,
    token: &AccessToken,
) -> Result<Order> {
    match api.fetch_order(order_id, token).await {
        Ok(order) => Ok(order),
        Err(MarketplaceError::OrderNotFound(_)) => {
            tracing::debug!(order_id, "direct lookup missed, trying pack fallback");
            if let Some(pack) = api.fetch_pack(order_id, token).await?
                && let Some(first) = pack.orders.first()
            {
                return api.fetch_order(&first.id, token).await;
            }
            Err(MarketplaceError::OrderNotFound(order_id.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Resolves billing info, using the same pack fallback as order retrieval.
pub async fn resolve_billing_info<A: MarketplaceApi + ?Sized>(
    api: &A,
    order_id: &str,
    token: &AccessToken,
) -> Result<BillingInfoResponse> {
    if let Some(billing) = api.billing_info(order_id, token).await? {
        return Ok(billing);
    }

    tracing::debug!(order_id, "billing info missed, trying pack fallback");
    if let Some(pack) = api.fetch_pack(order_id, token).await?
        && let Some(first) = pack.orders.first()
        && let Some(billing) = api.billing_info(&first.id, token).await?
    {
        return Ok(billing);
    }

    Err(MarketplaceError::BillingUnavailable(order_id.to_string()))
}

/// reqwest-backed marketplace client.
#[derive(Clone)]
pub struct HttpMarketplaceApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMarketplaceApi {
    /// Creates a client against `base_url` (no trailing slash).
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn unexpected(response: reqwest::Response) -> MarketplaceError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        MarketplaceError::UnexpectedStatus { status, body }
    }
}

#[async_trait]
impl MarketplaceApi for HttpMarketplaceApi {
    async fn fetch_order(&self, order_id: &str, token: &AccessToken) -> Result<Order> {
        let response = self
            .client
            .get(format!("{}/orders/{order_id}", self.base_url))
            .bearer_auth(&token.token)
            .send()
            .await?;

        match response.status().as_u16() {
            200..=299 => Ok(response.json().await?),
            404 => Err(MarketplaceError::OrderNotFound(order_id.to_string())),
            _ => Err(Self::unexpected(response).await),
        }
    }

    async fn fetch_pack(&self, pack_id: &str, token: &AccessToken) -> Result<Option<Pack>> {
        let response = self
            .client
            .get(format!("{}/packs/{pack_id}", self.base_url))
            .bearer_auth(&token.token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            Ok(None)
        }
    }

    async fn billing_info(
        &self,
        order_id: &str,
        token: &AccessToken,
    ) -> Result<Option<BillingInfoResponse>> {
        let response = self
            .client
            .get(format!("{}/orders/{order_id}/billing_info", self.base_url))
            .bearer_auth(&token.token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            Ok(None)
        }
    }

    async fn fetch_item(&self, item_id: &str) -> Result<Item> {
        let response = self
            .client
            .get(format!("{}/items/{item_id}", self.base_url))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::unexpected(response).await)
        }
    }

    async fn shipment(&self, shipment_id: &str, token: &AccessToken) -> Result<Shipment> {
        let response = self
            .client
            .get(format!("{}/shipments/{shipment_id}", self.base_url))
            .bearer_auth(&token.token)
            // Opts in to the current response shape for this endpoint.
            .header("x-format-new", "true")
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::unexpected(response).await)
        }
    }

    async fn upload_invoice(
        &self,
        shipment_id: &str,
        document: &str,
        token: &AccessToken,
    ) -> Result<()> {
        let response = self
            .client
            .post(format!(
                "{}/shipments/{shipment_id}/invoice_data?siteId=MLB",
                self.base_url
            ))
            .bearer_auth(&token.token)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .header(reqwest::header::ACCEPT, "application/xml")
            .body(document.to_string())
            .send()
            .await?;

        let status = response.status().as_u16();
        if invoice_upload_accepted(status) {
            Ok(())
        } else {
            Err(Self::unexpected(response).await)
        }
    }
}

struct InMemoryMarketplaceState {
    orders: HashMap<String, Order>,
    packs: HashMap<String, Pack>,
    billing: HashMap<String, BillingInfoResponse>,
    items: HashMap<String, Item>,
    shipments: HashMap<String, Shipment>,
    upload_status: u16,
    uploads: Vec<(String, String)>,
    order_fetches: u32,
}

impl Default for InMemoryMarketplaceState {
    fn default() -> Self {
        Self {
            orders: HashMap::new(),
            packs: HashMap::new(),
            billing: HashMap::new(),
            items: HashMap::new(),
            shipments: HashMap::new(),
            // Uploads succeed unless a test picks another status.
            upload_status: 200,
            uploads: Vec::new(),
            order_fetches: 0,
        }
    }
}

/// In-memory marketplace double for testing.
#[derive(Clone, Default)]
pub struct InMemoryMarketplaceApi {
    state: Arc<RwLock<InMemoryMarketplaceState>>,
}

impl InMemoryMarketplaceApi {
    /// Creates an empty double; uploads succeed with status 200 by default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an order under its id.
    pub async fn insert_order(&self, order: Order) {
        let mut state = self.state.write().await;
        state.orders.insert(order.id.clone(), order);
    }

    /// Registers a pack under the given id.
    pub async fn insert_pack(&self, pack_id: &str, pack: Pack) {
        self.state
            .write()
            .await
            .packs
            .insert(pack_id.to_string(), pack);
    }

    /// Registers billing info for an order id.
    pub async fn insert_billing(&self, order_id: &str, billing: BillingInfoResponse) {
        self.state
            .write()
            .await
            .billing
            .insert(order_id.to_string(), billing);
    }

    /// Registers a catalog item.
    pub async fn insert_item(&self, item: Item) {
        let mut state = self.state.write().await;
        state.items.insert(item.id.clone(), item);
    }

    /// Registers a shipment status.
    pub async fn insert_shipment(&self, shipment_id: &str, shipment: Shipment) {
        self.state
            .write()
            .await
            .shipments
            .insert(shipment_id.to_string(), shipment);
    }

    /// Sets the status code the upload endpoint answers with.
    pub async fn set_upload_status(&self, status: u16) {
        self.state.write().await.upload_status = status;
    }

    /// Returns the `(shipment_id, document)` pairs uploaded so far.
    pub async fn uploads(&self) -> Vec<(String, String)> {
        self.state.read().await.uploads.clone()
    }

    /// Number of direct order fetches observed.
    pub async fn order_fetch_count(&self) -> u32 {
        self.state.read().await.order_fetches
    }
}

#[async_trait]
impl MarketplaceApi for InMemoryMarketplaceApi {
    async fn fetch_order(&self, order_id: &str, _token: &AccessToken) -> Result<Order> {
        let mut state = self.state.write().await;
        state.order_fetches += 1;
        state
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.to_string()))
    }

    async fn fetch_pack(&self, pack_id: &str, _token: &AccessToken) -> Result<Option<Pack>> {
        Ok(self.state.read().await.packs.get(pack_id).cloned())
    }

    async fn billing_info(
        &self,
        order_id: &str,
        _token: &AccessToken,
    ) -> Result<Option<BillingInfoResponse>> {
        Ok(self.state.read().await.billing.get(order_id).cloned())
    }

    async fn fetch_item(&self, item_id: &str) -> Result<Item> {
        self.state
            .read()
            .await
            .items
            .get(item_id)
            .cloned()
            .ok_or_else(|| MarketplaceError::UnexpectedStatus {
                status: 404,
                body: format!("unknown item {item_id}"),
            })
    }

    async fn shipment(&self, shipment_id: &str, _token: &AccessToken) -> Result<Shipment> {
        self.state
            .read()
            .await
            .shipments
            .get(shipment_id)
            .cloned()
            .ok_or_else(|| MarketplaceError::UnexpectedStatus {
                status: 404,
                body: format!("unknown shipment {shipment_id}"),
            })
    }

    async fn upload_invoice(
        &self,
        shipment_id: &str,
        document: &str,
        _token: &AccessToken,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let status = state.upload_status;
        if invoice_upload_accepted(status) {
            state
                .uploads
                .push((shipment_id.to_string(), document.to_string()));
            Ok(())
        } else {
            Err(MarketplaceError::UnexpectedStatus {
                status,
                body: "upload rejected".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackOrder;

    fn token() -> AccessToken {
        AccessToken::new("APP_USR-1-998877")
    }

    fn order(id: &str) -> Order {
        serde_json::from_str(&format!(
            r#"{{"id": "{id}", "date_created": "2025-08-01T10:00:00.000-03:00",
                 "order_items": [{{"item": {{"id": "MLB111", "title": "Filtro"}},
                                  "unit_price": 150.0, "quantity": 1}}],
                 "shipping": {{"id": 44331122}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn upload_quirk_status_is_accepted() {
        assert!(invoice_upload_accepted(200));
        assert!(invoice_upload_accepted(201));
        assert!(invoice_upload_accepted(406));
        assert!(!invoice_upload_accepted(400));
        assert!(!invoice_upload_accepted(500));
    }

    #[tokio::test]
    async fn resolve_order_direct_hit() {
        let api = InMemoryMarketplaceApi::default();
        api.insert_order(order("2000012345678")).await;

        let resolved = resolve_order(&api, "2000012345678", &token()).await.unwrap();
        assert_eq!(resolved.id, "2000012345678");
        assert_eq!(api.order_fetch_count().await, 1);
    }

    #[tokio::test]
    async fn resolve_order_via_pack_matches_direct_fetch() {
        let api = InMemoryMarketplaceApi::default();
        api.insert_order(order("2000012340001")).await;
        api.insert_pack(
            "3000000000001",
            Pack {
                orders: vec![PackOrder {
                    id: "2000012340001".to_string(),
                }],
            },
        )
        .await;

        let resolved = resolve_order(&api, "3000000000001", &token()).await.unwrap();
        let direct = resolve_order(&api, "2000012340001", &token()).await.unwrap();
        assert_eq!(resolved.id, direct.id);
        assert_eq!(resolved.order_items.len(), direct.order_items.len());
    }

    #[tokio::test]
    async fn resolve_order_fails_when_both_paths_miss() {
        let api = InMemoryMarketplaceApi::default();
        let result = resolve_order(&api, "404404", &token()).await;
        assert!(matches!(result, Err(MarketplaceError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn resolve_billing_info_via_pack() {
        let api = InMemoryMarketplaceApi::default();
        api.insert_pack(
            "3000000000001",
            Pack {
                orders: vec![PackOrder {
                    id: "2000012340001".to_string(),
                }],
            },
        )
        .await;
        let billing: BillingInfoResponse = serde_json::from_str(
            r#"{"billing_info": {"doc_type": "CPF", "doc_number": "09059264630",
                "additional_info": {"FIRST_NAME": "Maria", "LAST_NAME": "Silva"}}}"#,
        )
        .unwrap();
        api.insert_billing("2000012340001", billing).await;

        let resolved = resolve_billing_info(&api, "3000000000001", &token())
            .await
            .unwrap();
        assert_eq!(resolved.billing_info.doc_number, "09059264630");
    }

    #[tokio::test]
    async fn upload_rejection_surfaces_status() {
        let api = InMemoryMarketplaceApi::default();
        api.set_upload_status(400).await;

        let result = api.upload_invoice("44331122", "<nfe/>", &token()).await;
        assert!(
            matches!(result, Err(MarketplaceError::UnexpectedStatus { status: 400, .. }))
        );
        assert!(api.uploads().await.is_empty());
    }

    #[tokio::test]
    async fn upload_quirk_status_records_document() {
        let api = InMemoryMarketplaceApi::default();
        api.set_upload_status(406).await;

        api.upload_invoice("44331122", "<nfe/>", &token()).await.unwrap();
        assert_eq!(api.uploads().await.len(), 1);
    }
}
