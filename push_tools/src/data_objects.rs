use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::helpers::is_stale_token_error;

/// What the user sees on their device, plus a string-only data payload for the app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    pub fn new<S: Into<String>, T: Into<String>>(title: S, body: T) -> Self {
        Self { title: title.into(), body: body.into(), data: BTreeMap::new() }
    }

    pub fn with_data<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    pub delivered: usize,
    pub failed: usize,
    /// Tokens the provider reported as unregistered or malformed.
    pub invalid_tokens: Vec<String>,
}

impl SendReport {
    pub(crate) fn merge(&mut self, other: SendReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.invalid_tokens.extend(other.invalid_tokens);
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub sound: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct MulticastRequest<'a> {
    pub registration_ids: &'a [String],
    pub notification: Notification<'a>,
    #[serde(skip_serializing_if = "no_data")]
    pub data: &'a BTreeMap<String, String>,
    pub priority: &'a str,
}

fn no_data(data: &&BTreeMap<String, String>) -> bool {
    data.is_empty()
}

impl<'a> MulticastRequest<'a> {
    pub fn new(message: &'a PushMessage, tokens: &'a [String]) -> Self {
        Self {
            registration_ids: tokens,
            notification: Notification { title: &message.title, body: &message.body, sound: "default" },
            data: &message.data,
            priority: "high",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MulticastResponse {
    #[serde(default)]
    pub success: usize,
    #[serde(default)]
    pub failure: usize,
    #[serde(default)]
    pub results: Vec<TokenResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenResult {
    pub error: Option<String>,
}

impl MulticastResponse {
    /// Results come back in the same order as the tokens in the request.
    pub fn into_report(self, tokens: &[String]) -> SendReport {
        let invalid_tokens = self
            .results
            .iter()
            .zip(tokens)
            .filter_map(|(r, token)| r.error.as_deref().filter(|e| is_stale_token_error(e)).map(|_| token.clone()))
            .collect();
        SendReport { delivered: self.success, failed: self.failure, invalid_tokens }
    }
}
