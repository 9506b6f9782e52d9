use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::error::AppError;
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvent {
    JoinApproved,
    JoinRejected,
}

impl NotifyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyEvent::JoinApproved => "JOIN_APPROVED",
            NotifyEvent::JoinRejected => "JOIN_REJECTED",
        }
    }
}

/// Fire-and-forget delivery. Implementations swallow their own failures;
/// nothing here may surface on the caller's decision path.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotifyEvent, user: &User, payload: serde_json::Value);
}

pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: NotifyEvent, user: &User, payload: serde_json::Value) {
        let body = serde_json::json!({
            "event": event.as_str(),
            "user_id": user.id,
            "username": user.username,
            "payload": payload,
        });

        match self.client.post(&self.url).json(&body).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(
                    "notification webhook returned {} for {}",
                    response.status(),
                    event.as_str()
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!("notification delivery failed for {}: {}", event.as_str(), e);
            }
        }
    }
}

pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: NotifyEvent, _user: &User, _payload: serde_json::Value) {}
}
