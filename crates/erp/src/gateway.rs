//! ERP gateway client.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::{
    AddressUpsert, CustomerUpsert, DocumentNumber, GatewayAck, OrderSubmission, SubmitResponse,
    TokenResponse,
};
use crate::{ErpError, Result};

/// Gateway authentication material, loaded from configuration.
#[derive(Debug, Clone)]
pub struct ErpCredentials {
    /// User-name prefix; the company code is appended per call.
    pub user_prefix: String,
    /// Shared gateway credential.
    pub shared_secret: String,
    /// Licensed package name.
    pub package: String,
}

/// Operations against the ERP gateway.
///
/// Every call is bearer-authenticated with a token scoped to the company
/// the order buys through.
#[async_trait]
pub trait ErpGateway: Send + Sync {
    /// Acquires a gateway token for the given company.
    async fn fetch_token(&self, company_code: &str) -> Result<String>;

    /// Upserts a customer; the gateway keys on the business document number.
    async fn register_customer(&self, token: &str, customer: &CustomerUpsert) -> Result<()>;

    /// Upserts the customer's delivery address.
    async fn register_address(&self, token: &str, address: &AddressUpsert) -> Result<()>;

    /// Submits the canonical order payload; returns the document number.
    async fn submit_order(&self, token: &str, order: &OrderSubmission) -> Result<DocumentNumber>;
}

/// reqwest-backed gateway client.
#[derive(Clone)]
pub struct HttpErpGateway {
    client: reqwest::Client,
    base_url: String,
    credentials: ErpCredentials,
}

impl HttpErpGateway {
    /// Creates a client against `base_url` (no trailing slash).
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: ErpCredentials,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credentials,
        }
    }

    async fn post_ack(&self, path: &str, token: &str, body: &impl serde::Serialize) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ErpError::RegistrationFailed(format!(
                "status {status}: {body}"
            )));
        }

        let ack: GatewayAck = response.json().await?;
        if !ack.success {
            return Err(ErpError::RegistrationFailed(ack.message));
        }
        Ok(())
    }
}

#[async_trait]
impl ErpGateway for HttpErpGateway {
    async fn fetch_token(&self, company_code: &str) -> Result<String> {
        // Alias companies authenticate through company 17.
        let company = if company_code.chars().all(|c| c.is_ascii_digit()) {
            company_code
        } else {
            "17"
        };
        let user = format!("{}{company}", self.credentials.user_prefix);

        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .query(&[
                ("usuario", user.as_str()),
                ("senha", self.credentials.shared_secret.as_str()),
                ("idioma", "PT"),
                ("pacote", self.credentials.package.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ErpError::TokenUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ErpError::TokenUnavailable(format!(
                "token endpoint returned status {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ErpError::TokenUnavailable(e.to_string()))?;
        if body.data.token.is_empty() {
            return Err(ErpError::TokenUnavailable(
                "token endpoint returned an empty token".to_string(),
            ));
        }
        Ok(body.data.token)
    }

    async fn register_customer(&self, token: &str, customer: &CustomerUpsert) -> Result<()> {
        self.post_ack("customers", token, customer).await
    }

    async fn register_address(&self, token: &str, address: &AddressUpsert) -> Result<()> {
        self.post_ack("customers/address", token, address).await
    }

    async fn submit_order(&self, token: &str, order: &OrderSubmission) -> Result<DocumentNumber> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .bearer_auth(token)
            .json(order)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ErpError::UnexpectedStatus { status, body });
        }

        let body: SubmitResponse = response.json().await?;
        if !body.success {
            return Err(ErpError::OrderRejected(body.message));
        }
        match body.data.document_number {
            Some(number) if !number.is_empty() => Ok(number),
            _ => Err(ErpError::OrderRejected(
                "no document number in gateway response".to_string(),
            )),
        }
    }
}

#[derive(Default)]
struct InMemoryErpState {
    customers: Vec<CustomerUpsert>,
    addresses: Vec<AddressUpsert>,
    orders: Vec<OrderSubmission>,
    fail_on_customer: bool,
    fail_on_address: bool,
    fail_on_submit: bool,
    next_document: u64,
}

/// In-memory gateway double for testing.
#[derive(Clone, Default)]
pub struct InMemoryErpGateway {
    state: Arc<RwLock<InMemoryErpState>>,
}

impl InMemoryErpGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the customer upsert to answer `sucesso=false`.
    pub async fn set_fail_on_customer(&self, fail: bool) {
        self.state.write().await.fail_on_customer = fail;
    }

    /// Configures the address upsert to answer `sucesso=false`.
    pub async fn set_fail_on_address(&self, fail: bool) {
        self.state.write().await.fail_on_address = fail;
    }

    /// Configures order submission to be rejected.
    pub async fn set_fail_on_submit(&self, fail: bool) {
        self.state.write().await.fail_on_submit = fail;
    }

    /// Number of customer upserts accepted.
    pub async fn customer_count(&self) -> usize {
        self.state.read().await.customers.len()
    }

    /// Number of address upserts accepted.
    pub async fn address_count(&self) -> usize {
        self.state.read().await.addresses.len()
    }

    /// Number of orders accepted.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// The last accepted order payload, if any.
    pub async fn last_order(&self) -> Option<OrderSubmission> {
        self.state.read().await.orders.last().cloned()
    }

    /// The last accepted customer payload, if any.
    pub async fn last_customer(&self) -> Option<CustomerUpsert> {
        self.state.read().await.customers.last().cloned()
    }
}

#[async_trait]
impl ErpGateway for InMemoryErpGateway {
    async fn fetch_token(&self, company_code: &str) -> Result<String> {
        Ok(format!("erp-token-{company_code}"))
    }

    async fn register_customer(&self, _token: &str, customer: &CustomerUpsert) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_customer {
            return Err(ErpError::RegistrationFailed(
                "customer refused".to_string(),
            ));
        }
        state.customers.push(customer.clone());
        Ok(())
    }

    async fn register_address(&self, _token: &str, address: &AddressUpsert) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_address {
            return Err(ErpError::RegistrationFailed("address refused".to_string()));
        }
        state.addresses.push(address.clone());
        Ok(())
    }

    async fn submit_order(&self, _token: &str, order: &OrderSubmission) -> Result<DocumentNumber> {
        let mut state = self.state.write().await;
        if state.fail_on_submit {
            return Err(ErpError::OrderRejected("order refused".to_string()));
        }
        state.next_document += 1;
        state.orders.push(order.clone());
        Ok(DocumentNumber::new(format!("77{:04}", state.next_document)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> OrderSubmission {
        OrderSubmission {
            web_order_id: 1005502702,
            customer_code: "09059264630".to_string(),
            address_type: 4,
            carrier_code: 0,
            freight_total: 0.0,
            intermediary_tax_id: "03361252000134".to_string(),
            intermediary_name: "Mercado Livre".to_string(),
            buyer_label: "ECOMML17".to_string(),
            items: vec![],
            payments: vec![],
        }
    }

    #[tokio::test]
    async fn submit_returns_sequential_document_numbers() {
        let gateway = InMemoryErpGateway::new();
        let first = gateway.submit_order("t", &submission()).await.unwrap();
        let second = gateway.submit_order("t", &submission()).await.unwrap();
        assert_eq!(first.as_str(), "770001");
        assert_eq!(second.as_str(), "770002");
        assert_eq!(gateway.order_count().await, 2);
    }

    #[tokio::test]
    async fn rejected_submission_records_nothing() {
        let gateway = InMemoryErpGateway::new();
        gateway.set_fail_on_submit(true).await;
        let result = gateway.submit_order("t", &submission()).await;
        assert!(matches!(result, Err(ErpError::OrderRejected(_))));
        assert_eq!(gateway.order_count().await, 0);
    }
}
