//! Best-effort completion notifications.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

/// Sends one summary message per saga completion, success or failure.
///
/// Delivery is fire-and-forget: failures are logged and never escalate to
/// the saga's own result, hence no error in the signature.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    channel_id: &'a str,
    text: &'a str,
}

/// Webhook-backed notifier posting to a chat channel.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
    channel_id: String,
}

impl WebhookNotifier {
    /// Creates a notifier posting to `webhook_url` for `channel_id`.
    pub fn new(
        client: reqwest::Client,
        webhook_url: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
            channel_id: channel_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) {
        let payload = WebhookPayload {
            channel_id: &self.channel_id,
            text: message,
        };

        match self.client.post(&self.webhook_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("notification delivered");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "notification rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "notification delivery failed");
            }
        }
    }
}

/// Notifier that records messages in memory, for testing.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<RwLock<Vec<String>>>,
}

impl RecordingNotifier {
    /// Creates an empty recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far, in order.
    pub async fn messages(&self) -> Vec<String> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.write().await.push(message.to_string());
    }
}
