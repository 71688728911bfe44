use std::{env, fmt::Display, str::FromStr, time::Duration};

use dispatch_common::helpers::{env_flag, parse_value};
use log::*;
use push_tools::PushConfig;

const DEFAULT_TDS_HOST: &str = "127.0.0.1";
const DEFAULT_TDS_PORT: u16 = 8380;
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 25;
const DEFAULT_AUTO_CANCEL_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    /// How often the expiry worker looks for published missions that nobody took. The age limit itself is a
    /// business setting (`auto_cancel_minutes`).
    pub auto_cancel_check_interval: Duration,
    /// If true, the pending-mission alert worker is not started at all.
    pub disable_alerts: bool,
    pub push: PushConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TDS_HOST.to_string(),
            port: DEFAULT_TDS_PORT,
            database_url: String::default(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            auto_cancel_check_interval: DEFAULT_AUTO_CANCEL_CHECK_INTERVAL,
            disable_alerts: false,
            push: PushConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TDS_HOST").ok().unwrap_or_else(|| DEFAULT_TDS_HOST.into());
        let port = env_or_default("TDS_PORT", DEFAULT_TDS_PORT);
        let database_url = env::var("TDS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TDS_DATABASE_URL is not set. Please set it to the URL for the dispatch database.");
            String::default()
        });
        let max_db_connections = env_or_default("TDS_MAX_DB_CONNECTIONS", DEFAULT_MAX_DB_CONNECTIONS).max(1);
        let check_secs = env_or_default("TDS_AUTO_CANCEL_CHECK_INTERVAL", DEFAULT_AUTO_CANCEL_CHECK_INTERVAL.as_secs());
        let auto_cancel_check_interval = Duration::from_secs(check_secs.max(1));
        let disable_alerts = env_flag("TDS_DISABLE_ALERTS", false);
        if disable_alerts {
            info!("🪛️ Pending-mission alerts are disabled by TDS_DISABLE_ALERTS");
        }
        let push = PushConfig::new_from_env_or_default();
        Self { host, port, database_url, max_db_connections, auto_cancel_check_interval, disable_alerts, push }
    }
}

/// Reads `name` from the environment. A missing value silently yields `default`; an invalid one is logged first.
fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match env::var(name) {
        Err(_) => default,
        Ok(s) => parse_value::<T>(Some(&s)).unwrap_or_else(|e| {
            error!("🪛️ {name}: {e}. Using the default, {default}, instead.");
            default
        }),
    }
}
