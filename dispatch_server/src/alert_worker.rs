use std::time::Duration;

use dispatch_engine::{AlertApi, DispatchSettings, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

use crate::push::PushChannel;

const MIN_ALERT_INTERVAL: Duration = Duration::from_secs(1);

/// Starts the pending-mission alert worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The cadence is the `alert_interval_ms` setting, re-read before every round so that changes take effect without a
/// restart.
pub fn start_alert_worker(db: SqliteDatabase, api: AlertApi<SqliteDatabase, PushChannel>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("🕰️ Pending-mission alert worker started");
        loop {
            let interval = match DispatchSettings::load(&db).await {
                Ok(settings) => Duration::from_millis(settings.alert_interval_ms).max(MIN_ALERT_INTERVAL),
                Err(e) => {
                    warn!("🕰️ Could not read the alert interval. {e}. Trying again in a minute.");
                    Duration::from_secs(60)
                },
            };
            tokio::time::sleep(interval).await;
            match api.send_pending_alerts().await {
                Ok(report) if report.operators_alerted > 0 => {
                    debug!("🕰️ Alert round complete: {report:?}");
                },
                Ok(_) => trace!("🕰️ Alert round complete. Nobody to alert."),
                Err(e) => error!("🕰️ Error sending pending-mission alerts: {e}"),
            }
        }
    })
}
