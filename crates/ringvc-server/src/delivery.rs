//! Outbound message delivery.
//!
//! The engine only decides what to say and to whom; a [`Delivery`]
//! implementation gets the text into the channel's chat.

use async_trait::async_trait;
use ringvc_shared::{ChannelId, DeliveryError, GroupId, UserId};
use serde::Serialize;
use tracing::info;

/// A message for a channel's text chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub channel: ChannelId,
    pub text: String,
    /// Users the message is allowed to ping.
    pub users: Vec<UserId>,
    /// Groups the message is allowed to ping.
    pub groups: Vec<GroupId>,
}

#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Posts notifications as JSON to the platform adapter.
pub struct WebhookDelivery {
    client: reqwest::Client,
    url: String,
}

impl WebhookDelivery {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Delivery for WebhookDelivery {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| DeliveryError::new(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        // The adapter answers failures with the platform's own message.
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.to_string()
        } else {
            body.trim().to_string()
        };
        Err(DeliveryError::new(message))
    }
}

/// Logs notifications instead of sending them.
pub struct LogDelivery;

#[async_trait]
impl Delivery for LogDelivery {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        info!(
            channel = %notification.channel,
            users = notification.users.len(),
            groups = notification.groups.len(),
            text = %notification.text,
            "Delivering notification"
        );
        Ok(())
    }
}
