use std::{
    collections::{BTreeSet, HashSet},
    fmt::Debug,
};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Mission, OperatorProfile},
    dispatch_api::DispatchSettings,
    realtime::{ActorKey, PushDelivery, RealtimeFanout, RealtimeMessage},
    traits::{DispatchDatabase, DispatchError},
};

/// What one round of pending-mission alerts achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertReport {
    /// Published missions nobody holds yet.
    pub pending: usize,
    pub operators_alerted: usize,
    /// Operators that were skipped because they are busy on another mission.
    pub suppressed: usize,
    pub live: usize,
    pub pushed: usize,
}

/// `AlertApi` reminds idle operators that missions are waiting near them.
pub struct AlertApi<B, P> {
    db: B,
    fanout: RealtimeFanout<B, P>,
}

impl<B, P> Debug for AlertApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AlertApi")
    }
}

impl<B: Clone, P> Clone for AlertApi<B, P> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), fanout: self.fanout.clone() }
    }
}

impl<B, P> AlertApi<B, P> {
    pub fn new(db: B, fanout: RealtimeFanout<B, P>) -> Self {
        Self { db, fanout }
    }
}

impl<B, P> AlertApi<B, P>
where
    B: DispatchDatabase,
    P: PushDelivery,
{
    /// Sends every available, opted-in external operator the number of unassigned published missions in their zones.
    ///
    /// Connected operators get a socket event, the others a push notification. Operators with an active mission are
    /// left alone when `alert_suppress_when_busy` is set.
    pub async fn send_pending_alerts(&self) -> Result<AlertReport, DispatchError> {
        let settings = DispatchSettings::load(&self.db).await?;
        if !settings.alert_enabled {
            trace!("🕰️ Pending-mission alerts are switched off");
            return Ok(AlertReport::default());
        }
        let pending = self.db.fetch_unassigned_published().await?;
        let mut report = AlertReport { pending: pending.len(), ..Default::default() };
        if pending.is_empty() {
            trace!("🕰️ No pending missions. No alerts to send.");
            return Ok(report);
        }
        let operators = self.db.fetch_alertable_operators().await?;
        let busy = if settings.alert_suppress_when_busy {
            self.db.busy_operator_ids().await?.into_iter().collect::<HashSet<_>>()
        } else {
            HashSet::new()
        };
        for operator in operators {
            if busy.contains(&operator.user_id) {
                report.suppressed += 1;
                continue;
            }
            let (count, zones) = nearby_pending(&operator, &pending, &settings);
            if count == 0 {
                continue;
            }
            let message = RealtimeMessage::PendingMissionsNearby { count, zones };
            let sent = self.fanout.notify(ActorKey::operator(operator.user_id), message).await;
            report.operators_alerted += 1;
            report.live += sent.delivered;
            report.pushed += sent.pushed;
        }
        info!(
            "🕰️ {} pending mission(s). Alerted {} operator(s) ({} live, {} by push), {} busy operator(s) skipped",
            report.pending, report.operators_alerted, report.live, report.pushed, report.suppressed
        );
        Ok(report)
    }
}

/// Counts the pending missions relevant to one operator: those in one of the operator's zones, plus missions without
/// a zone that are within matching range of the operator's last position.
fn nearby_pending(
    operator: &OperatorProfile,
    pending: &[Mission],
    settings: &DispatchSettings,
) -> (usize, Vec<String>) {
    let operator_zones = operator.zone_list();
    let position = operator.position();
    let mut zones = BTreeSet::new();
    let mut count = 0;
    for mission in pending {
        match mission.zone.as_deref().map(|z| z.trim().to_lowercase()) {
            Some(zone) if !zone.is_empty() => {
                if operator_zones.contains(&zone) {
                    count += 1;
                    zones.insert(zone);
                }
            },
            _ => {
                let radius = settings.radius_for(mission.service_kind);
                if position.is_some_and(|p| p.distance_to(&mission.origin()) <= radius) {
                    count += 1;
                }
            },
        }
    }
    (count, zones.into_iter().collect())
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{Amount, MissionId, MissionStatus, ServiceKind};

    fn operator(zones: &str, position: Option<(f64, f64)>) -> OperatorProfile {
        let now = Utc::now();
        OperatorProfile {
            user_id: 1,
            lat: position.map(|p| p.0),
            lng: position.map(|p| p.1),
            zones: zones.into(),
            available: true,
            internal: false,
            alerts_enabled: true,
            balance: Amount::default(),
            pending_balance: Amount::default(),
            location_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn mission(id: i64, zone: Option<&str>) -> Mission {
        let now = Utc::now();
        Mission {
            id: MissionId(id),
            client_id: id,
            operator_id: None,
            service_kind: ServiceKind::BatteryBoost,
            status: MissionStatus::Published,
            origin_lat: 12.62,
            origin_lng: -8.0,
            destination_lat: None,
            destination_lng: None,
            zone: zone.map(String::from),
            distance_km: None,
            estimated_price: Amount::from(5_000),
            final_price: None,
            currency: "XOF".into(),
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            published_at: Some(now),
            accepted_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn zones_overlap_case_insensitively() {
        let pending = [mission(1, Some("Kati")), mission(2, Some("hamdallaye")), mission(3, Some("segou"))];
        let settings = DispatchSettings::default();
        let (count, zones) = nearby_pending(&operator("kati, Hamdallaye", None), &pending, &settings);
        assert_eq!(count, 2);
        assert_eq!(zones, vec!["hamdallaye", "kati"]);
    }

    #[test]
    fn missions_without_a_zone_fall_back_to_distance() {
        let pending = [mission(1, None)];
        let settings = DispatchSettings::default();
        assert_eq!(nearby_pending(&operator("", Some((12.63, -8.01))), &pending, &settings).0, 1);
        assert_eq!(nearby_pending(&operator("", Some((13.43, -6.21))), &pending, &settings).0, 0);
        assert_eq!(nearby_pending(&operator("kati", None), &pending, &settings).0, 0);
    }
}
