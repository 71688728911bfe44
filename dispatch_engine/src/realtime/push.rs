use std::collections::BTreeMap;

use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A notification for the push-delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl PushNotification {
    pub fn new<S: Into<String>, T: Into<String>>(title: S, body: T) -> Self {
        Self { title: title.into(), body: body.into(), data: BTreeMap::new() }
    }

    pub fn with_data<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// What happened to a delivery attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub delivered: usize,
    /// Tokens the provider says are no longer valid. These get pruned from the token store.
    pub invalid_tokens: Vec<String>,
}

#[derive(Debug, Clone, Error)]
pub enum PushError {
    #[error("Push delivery is not configured")]
    NotConfigured,
    #[error("Could not reach the push provider: {0}")]
    Transport(String),
    #[error("The push provider rejected the request. Error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("Could not look up push tokens: {0}")]
    TokenLookup(String),
}

/// The push-delivery collaborator. Delivery is best-effort: the engine logs failures and never retries.
#[allow(async_fn_in_trait)]
pub trait PushDelivery {
    async fn deliver(&self, notification: &PushNotification, tokens: &[String]) -> Result<PushReport, PushError>;
}

/// A [`PushDelivery`] that only writes notifications to the log. Used when no provider is configured, and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyPush;

impl PushDelivery for LogOnlyPush {
    async fn deliver(&self, notification: &PushNotification, tokens: &[String]) -> Result<PushReport, PushError> {
        info!("🔔️ (not sent) '{}' to {} device(s): {}", notification.title, tokens.len(), notification.body);
        Ok(PushReport { delivered: 0, invalid_tokens: vec![] })
    }
}
