use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};

use crate::{
    config::PushConfig,
    data_objects::{MulticastRequest, MulticastResponse, PushMessage, SendReport},
    PushApiError,
};

/// The provider accepts at most this many registration ids per request.
pub const MAX_TOKENS_PER_REQUEST: usize = 1000;

#[derive(Clone)]
pub struct PushApi {
    config: PushConfig,
    client: Arc<Client>,
}

impl PushApi {
    pub fn new(config: PushConfig) -> Result<Self, PushApiError> {
        if !config.is_configured() {
            return Err(PushApiError::NotConfigured);
        }
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(format!("key={}", config.server_key.reveal()).as_str())
            .map_err(|e| PushApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PushApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Sends `message` to every token, in batches the provider accepts.
    ///
    /// A failing batch aborts the whole send. The report then only covers the batches that went through before it, so
    /// callers should treat an error as "some devices may not have been reached".
    pub async fn send(&self, message: &PushMessage, tokens: &[String]) -> Result<SendReport, PushApiError> {
        let mut report = SendReport::default();
        for batch in tokens.chunks(MAX_TOKENS_PER_REQUEST) {
            report.merge(self.send_batch(message, batch).await?);
        }
        debug!(
            "🔔️ '{}' sent to {} device(s). {} failed, {} stale token(s)",
            message.title,
            report.delivered,
            report.failed,
            report.invalid_tokens.len()
        );
        Ok(report)
    }

    async fn send_batch(&self, message: &PushMessage, tokens: &[String]) -> Result<SendReport, PushApiError> {
        trace!("🔔️ Sending push request for {} token(s) to {}", tokens.len(), self.config.endpoint);
        let body = MulticastRequest::new(message, tokens);
        let response = self
            .client
            .post(self.config.endpoint.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| PushApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            let result =
                response.json::<MulticastResponse>().await.map_err(|e| PushApiError::JsonError(e.to_string()))?;
            Ok(result.into_report(tokens))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| PushApiError::ResponseError(e.to_string()))?;
            Err(PushApiError::QueryError { status, message })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn a_server_key_is_required() {
        let config = PushConfig::new("https://push.example.com/send", "");
        assert!(matches!(PushApi::new(config), Err(PushApiError::NotConfigured)));
        let config = PushConfig::new("https://push.example.com/send", "AAAA-key");
        assert!(PushApi::new(config).is_ok());
    }
}
