// Webhook transport for operator notifications
//
// POSTs `{"title": ..., "body": ...}` as JSON to a configured URL. Works
// with most chat bridges (ntfy, Gotify proxies, Apprise API, n8n).

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    body: &'a str,
}

/// Minimal JSON webhook sender.
#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    url: Url,
}

impl WebhookClient {
    pub fn new(url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            url,
        })
    }

    /// Create a webhook sender with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Deliver one message. Any 2xx status counts as delivered.
    pub async fn send(&self, title: &str, body: &str) -> Result<(), Error> {
        debug!("POST {}", self.url);

        let resp = self
            .http
            .post(self.url.clone())
            .json(&WebhookPayload { title, body })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }
        Ok(())
    }
}
