//! Push delivery for the engine's realtime fan-out.
//!
//! With a server key configured, notifications go to the push provider through [`PushApi`]. Without one they are only
//! logged, so a development server behaves the same apart from the devices staying silent.
use dispatch_engine::{
    realtime::{LogOnlyPush, PushDelivery, PushError, PushNotification, PushReport, RealtimeFanout},
    SqliteDatabase,
};
use log::*;
use push_tools::{PushApi, PushApiError, PushConfig, PushMessage};

pub type ServerFanout = RealtimeFanout<SqliteDatabase, PushChannel>;

#[derive(Clone)]
pub enum PushChannel {
    Provider(PushApi),
    LogOnly(LogOnlyPush),
}

impl PushChannel {
    pub fn from_config(config: &PushConfig) -> Self {
        if !config.is_configured() {
            info!("🔔️ No push server key configured. Push notifications will only be logged.");
            return Self::LogOnly(LogOnlyPush);
        }
        match PushApi::new(config.clone()) {
            Ok(api) => {
                info!("🔔️ Push notifications will be delivered via {}", config.endpoint);
                Self::Provider(api)
            },
            Err(e) => {
                error!("🔔️ Could not create the push client. {e}. Push notifications will only be logged.");
                Self::LogOnly(LogOnlyPush)
            },
        }
    }
}

impl PushDelivery for PushChannel {
    async fn deliver(&self, notification: &PushNotification, tokens: &[String]) -> Result<PushReport, PushError> {
        match self {
            Self::LogOnly(log_only) => log_only.deliver(notification, tokens).await,
            Self::Provider(api) => {
                let message = to_push_message(notification);
                let report = api.send(&message, tokens).await.map_err(to_push_error)?;
                Ok(PushReport { delivered: report.delivered, invalid_tokens: report.invalid_tokens })
            },
        }
    }
}

fn to_push_message(notification: &PushNotification) -> PushMessage {
    notification
        .data
        .iter()
        .fold(PushMessage::new(&notification.title, &notification.body), |m, (k, v)| m.with_data(k, v))
}

fn to_push_error(e: PushApiError) -> PushError {
    match e {
        PushApiError::NotConfigured => PushError::NotConfigured,
        PushApiError::QueryError { status, message } => PushError::Rejected { status, message },
        other => PushError::Transport(other.to_string()),
    }
}
