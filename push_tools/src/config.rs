use std::time::Duration;

use dispatch_common::{helpers::parse_value, Secret};
use log::*;

pub const DEFAULT_PUSH_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct PushConfig {
    pub endpoint: String,
    pub server_key: Secret<String>,
    pub timeout: Duration,
}

impl PushConfig {
    pub fn new<S: Into<String>>(endpoint: S, server_key: S) -> Self {
        Self { endpoint: endpoint.into(), server_key: Secret::new(server_key.into()), timeout: DEFAULT_PUSH_TIMEOUT }
    }

    pub fn new_from_env_or_default() -> Self {
        let endpoint = std::env::var("TDS_PUSH_ENDPOINT").unwrap_or_else(|_| {
            debug!("🔔️ TDS_PUSH_ENDPOINT not set, using {DEFAULT_PUSH_ENDPOINT}");
            DEFAULT_PUSH_ENDPOINT.to_string()
        });
        let server_key = Secret::new(std::env::var("TDS_PUSH_SERVER_KEY").unwrap_or_else(|_| {
            warn!("🔔️ TDS_PUSH_SERVER_KEY not set. Push notifications will not be sent.");
            String::default()
        }));
        let timeout = std::env::var("TDS_PUSH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| parse_value::<u64>(Some(&s)).ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PUSH_TIMEOUT);
        Self { endpoint, server_key, timeout }
    }

    /// True if a server key is available. Without one, the provider will reject every request.
    pub fn is_configured(&self) -> bool {
        !self.server_key.is_empty()
    }
}
