use super::{DeliveryError, NotificationSink, Recipient, RecipientId};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the chat bridge.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

/// Sink that forwards messages to a chat bridge over HTTP.
///
/// - `POST {base}/messages/direct` with `{recipient, content}`
/// - `POST {base}/messages/channel` with `{channel, content}`
/// - `GET {base}/recipients` returning `[{id, name, bot}]`
pub struct HttpSink {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(config: SinkConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DeliveryError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        // Trailing slash so `join` appends instead of replacing the last segment.
        let base = format!("{}/", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            token: config.token,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post(&self, path: &str, target: &str, body: serde_json::Value) -> Result<(), DeliveryError> {
        let url = self.base_url.join(path)?;
        let response = self.request(self.client.post(url)).json(&body).send().await?;

        match response.status() {
            status if status.is_success() => {
                debug!(destination = %target, "Message delivered");
                Ok(())
            }
            status @ (StatusCode::FORBIDDEN | StatusCode::NOT_FOUND) => Err(DeliveryError::Rejected {
                target: target.to_string(),
                status: status.as_u16(),
            }),
            status => {
                warn!(destination = %target, status = status.as_u16(), "Chat bridge returned error");
                Err(DeliveryError::Unreachable {
                    message: format!("{} returned status {}", path, status),
                })
            }
        }
    }
}

#[async_trait]
impl NotificationSink for HttpSink {
    async fn send_direct(&self, recipient: &RecipientId, text: &str) -> Result<(), DeliveryError> {
        self.post(
            "messages/direct",
            recipient,
            json!({ "recipient": recipient, "content": text }),
        )
        .await
    }

    async fn broadcast(&self, channel: &str, text: &str) -> Result<(), DeliveryError> {
        self.post(
            "messages/channel",
            channel,
            json!({ "channel": channel, "content": text }),
        )
        .await
    }

    async fn recipients(&self) -> Result<Vec<Recipient>, DeliveryError> {
        let url = self.base_url.join("recipients")?;
        let response = self.request(self.client.get(url)).send().await?;

        if !response.status().is_success() {
            return Err(DeliveryError::Unreachable {
                message: format!("recipients returned status {}", response.status()),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| DeliveryError::Unreachable {
            message: format!("Invalid recipients payload: {}", e),
        })
    }
}
