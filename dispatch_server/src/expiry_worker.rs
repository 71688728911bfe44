use std::time::Duration;

use dispatch_engine::{db_types::Mission, MissionFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

use crate::push::PushChannel;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Each run cancels the published missions nobody accepted within the `auto_cancel_minutes` setting.
pub fn start_expiry_worker(api: MissionFlowApi<SqliteDatabase, PushChannel>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Mission expiry worker started. Checking every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running mission expiry job");
            match api.expire_stale_missions().await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No missions expired"),
                Ok(expired) => {
                    info!("🕰️ {} mission(s) expired", expired.len());
                    debug!("🕰️ Expired missions: {}", mission_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running mission expiry job: {e}");
                },
            }
        }
    })
}

fn mission_list(missions: &[Mission]) -> String {
    missions
        .iter()
        .map(|m| format!("[{}] {} for client {}", m.id, m.service_kind, m.client_id))
        .collect::<Vec<String>>()
        .join(", ")
}
