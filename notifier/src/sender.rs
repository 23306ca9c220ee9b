//! The sender capability (§9 "Polymorphism": "metric source and sender are
//! capability objects... small interfaces, not inheritance"). Webhook is the
//! one concrete transport this crate ships; other contact types plug into
//! the same trait from wherever they're implemented.

use std::time::Duration;

use async_trait::async_trait;
use shared::types::{Contact, NotificationEvent, PlottingOptions, TriggerData};

use crate::error::SendError;

/// `SendEvents(events, contact, trigger, plot, throttled) -> error` from §6.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Routing key this sender claims, e.g. `"webhook"`. Matches
    /// `Contact.contact_type` / `NotificationPackage.Contact.Type` in the
    /// original.
    fn contact_type(&self) -> &str;

    async fn send_events(
        &self,
        events: &[NotificationEvent],
        contact: &Contact,
        trigger: &TriggerData,
        plotting: &PlottingOptions,
        throttled: bool,
    ) -> Result<(), SendError>;
}

/// Posts a JSON payload to `contact.value` (the webhook URL). Grounded in
/// the original's webhook emit job: no redirect-following, a bounded
/// request timeout, and the response body/status recorded only for
/// diagnostics, not for deciding success/failure beyond the status code.
pub struct WebhookSender {
    client: reqwest::Client,
    timeout: Duration,
}

impl WebhookSender {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("reqwest client with static config always builds");
        Self { client, timeout }
    }
}

#[derive(serde::Serialize)]
struct WebhookPayload<'a> {
    trigger: &'a TriggerData,
    events: &'a [NotificationEvent],
    contact_value: &'a str,
    throttled: bool,
    plotting_enabled: bool,
}

#[async_trait]
impl Sender for WebhookSender {
    fn contact_type(&self) -> &str {
        "webhook"
    }

    async fn send_events(
        &self,
        events: &[NotificationEvent],
        contact: &Contact,
        trigger: &TriggerData,
        plotting: &PlottingOptions,
        throttled: bool,
    ) -> Result<(), SendError> {
        let payload = WebhookPayload {
            trigger,
            events,
            contact_value: &contact.value,
            throttled,
            plotting_enabled: plotting.enabled,
        };

        let response = self
            .client
            .post(&contact.value)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SendError::Timeout
                } else {
                    SendError::Transport(err.to_string())
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SendError::Rejected(format!(
                "webhook responded with status {}",
                response.status()
            )))
        }
    }
}
