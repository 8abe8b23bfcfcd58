//! Outbound delivery to chat recipients.
//!
//! The relay never talks to a chat platform directly; it hands finished text
//! to a [`NotificationSink`]. [`HttpSink`] forwards to a chat bridge over HTTP.

mod http;

pub use http::{HttpSink, SinkConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable identity of a recipient or channel on the chat side.
pub type RecipientId = String;

/// A member that can receive direct messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    #[serde(default)]
    pub name: String,
    /// Non-human accounts never receive notifications.
    #[serde(default)]
    pub bot: bool,
}

/// Where one notification goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Direct(RecipientId),
    Channel(String),
}

impl Target {
    /// Key under which this target's preferences are stored.
    pub fn preference_key(&self) -> &str {
        match self {
            Target::Direct(id) | Target::Channel(id) => id,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Direct(id) => write!(f, "user:{id}"),
            Target::Channel(id) => write!(f, "channel:{id}"),
        }
    }
}

/// A message the sink could not deliver.
#[derive(Debug, Error, Clone)]
pub enum DeliveryError {
    /// The chat side refused the message, e.g. the recipient disabled DMs
    #[error("Delivery to {target} rejected with status {status}")]
    Rejected { target: String, status: u16 },

    /// The chat bridge answered with an unexpected status
    #[error("Chat bridge unavailable: {message}")]
    Unreachable { message: String },

    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for DeliveryError {
    fn from(err: url::ParseError) -> Self {
        DeliveryError::Unreachable {
            message: err.to_string(),
        }
    }
}

/// Capabilities the relay needs from the chat platform.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends a direct message to one recipient.
    async fn send_direct(&self, recipient: &RecipientId, text: &str) -> Result<(), DeliveryError>;

    /// Posts a message to a channel.
    async fn broadcast(&self, channel: &str, text: &str) -> Result<(), DeliveryError>;

    /// Current members, bots included.
    async fn recipients(&self) -> Result<Vec<Recipient>, DeliveryError>;

    /// Delivers to either kind of target.
    async fn deliver(&self, target: &Target, text: &str) -> Result<(), DeliveryError> {
        match target {
            Target::Direct(id) => self.send_direct(id, text).await,
            Target::Channel(channel) => self.broadcast(channel, text).await,
        }
    }
}
