// ── Notifier implementations ──

use async_trait::async_trait;
use speedwindow_api::WebhookClient;
use tracing::warn;

use crate::error::CoreError;
use crate::port::Notifier;

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, title: &str, body: &str) -> Result<(), CoreError> {
        warn!(title, body, "operator notification");
        Ok(())
    }
}

/// Delivers notifications to a JSON webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: WebhookClient,
}

impl WebhookNotifier {
    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, title: &str, body: &str) -> Result<(), CoreError> {
        self.client
            .send(title, body)
            .await
            .map_err(|e| CoreError::Notification {
                message: format!("{}: {e}", self.client.url()),
            })
    }
}
