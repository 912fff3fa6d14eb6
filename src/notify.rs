//! Notification sink.
//!
//! Deliveries are fire-and-forget: failures are logged at warn severity and
//! never retried or surfaced to the watch session.

use chrono::Local;
use tracing::{debug, warn};

/// Embed color for the credential-rotation alert.
const CREDENTIAL_ALERT_COLOR: u32 = 770_000;

/// A structured alert, rendered as an embed by webhook sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Short alert title.
    pub title: String,
    /// One-line description.
    pub description: String,
    /// Severity color for sinks that render one.
    pub color: u32,
}

impl Alert {
    /// The alert raised when login is rejected with the credential-rotation
    /// phrase - the primary detection event.
    #[must_use]
    pub fn credential_rotation() -> Self {
        Self {
            title: "Mailbox password changed".into(),
            description: "Login was rejected with an invalid credentials response".into(),
            color: CREDENTIAL_ALERT_COLOR,
        }
    }
}

/// Delivers plain texts and structured alerts to an external endpoint.
///
/// Both operations are best-effort and infallible from the caller's side.
#[allow(async_fn_in_trait)]
pub trait NotificationSink {
    /// Delivers a short plain-text message.
    async fn send_text(&self, text: &str);

    /// Delivers a structured alert.
    async fn send_alert(&self, alert: &Alert);
}

/// Returns a human-readable local timestamp for notification texts.
#[must_use]
pub fn notification_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// [`NotificationSink`] implementation posting Discord-shaped JSON payloads
/// to a webhook endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Creates a sink posting to the given webhook endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Builds the payload for a plain-text delivery.
    fn text_payload(text: &str) -> serde_json::Value {
        serde_json::json!({ "content": text })
    }

    /// Builds the payload for a structured alert.
    fn alert_payload(alert: &Alert) -> serde_json::Value {
        serde_json::json!({
            "embeds": [{
                "title": alert.title,
                "description": alert.description,
                "color": alert.color,
            }]
        })
    }

    async fn post(&self, payload: &serde_json::Value) {
        let result = self.client.post(&self.url).json(payload).send().await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Notification delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Webhook rejected notification");
            }
            Err(error) => {
                warn!(error = %error, "Failed to deliver notification");
            }
        }
    }
}

impl NotificationSink for WebhookSink {
    async fn send_text(&self, text: &str) {
        self.post(&Self::text_payload(text)).await;
    }

    async fn send_alert(&self, alert: &Alert) {
        self.post(&Self::alert_payload(alert)).await;
    }
}
