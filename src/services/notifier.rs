//! notifier.rs
//!
//! Fire-and-forget отправка уведомлений во внешний push-шлюз.
//!
//! Сбой доставки никогда не валит родительскую команду: ошибку пишем
//! в лог и забываем. Ретраев нет - доставка "хотя бы постараемся",
//! exactly-once здесь не обещается.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::NotifierConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    Created,
    Updated,
    Cancelled,
    Uncancelled,
}

impl NotifyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Cancelled => "cancelled",
            Self::Uncancelled => "uncancelled",
        }
    }
}

#[derive(Debug, Serialize)]
struct NotifyPayload {
    event_id: i64,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    changed_fields: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct Notifier {
    http_client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn from_config(config: &NotifierConfig) -> Self {
        let webhook_url = if config.webhook_url.is_empty() {
            None
        } else {
            Some(config.webhook_url.clone())
        };

        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_default(),
            webhook_url,
        }
    }

    /// Отправляет уведомление в фоне и сразу возвращает управление.
    pub fn notify(&self, event_id: i64, action: NotifyAction, changed_fields: Option<Vec<String>>) {
        let Some(url) = self.webhook_url.clone() else {
            debug!("notifier disabled, skipping {} for event {}", action.as_str(), event_id);
            return;
        };

        let client = self.http_client.clone();
        let payload = NotifyPayload {
            event_id,
            action: action.as_str(),
            changed_fields,
        };

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("notified gateway: event={} action={}", event_id, payload.action);
                }
                Ok(resp) => {
                    warn!(
                        "notification gateway returned {} for event {} ({})",
                        resp.status(),
                        event_id,
                        payload.action
                    );
                }
                Err(e) => {
                    warn!("failed to notify gateway for event {}: {:?}", event_id, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_webhook_url_disables_dispatch() {
        let notifier = Notifier::from_config(&NotifierConfig {
            webhook_url: String::new(),
            timeout_seconds: 5,
        });
        assert!(notifier.webhook_url.is_none());
    }

    #[test]
    fn actions_serialize_to_wire_names() {
        assert_eq!(NotifyAction::Created.as_str(), "created");
        assert_eq!(NotifyAction::Uncancelled.as_str(), "uncancelled");
    }
}
