use std::{collections::HashSet, sync::Arc};

use log::*;

use crate::{
    db_types::{Mission, MissionEventType, MissionStatus, Role},
    realtime::{
        presence::{ActorKey, PresenceRegistry},
        PushDelivery,
        PushError,
        PushNotification,
        RealtimeMessage,
        TargetSet,
        Topic,
    },
    traits::PushTokenStore,
};

/// What a publish achieved. Push failures are counted, never returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Live connections the message was written to.
    pub delivered: usize,
    /// Offline users a push notification was attempted for.
    pub pushed: usize,
    pub push_failures: usize,
}

impl FanoutReport {
    fn merge(&mut self, other: FanoutReport) {
        self.delivered += other.delivered;
        self.pushed += other.pushed;
        self.push_failures += other.push_failures;
    }
}

/// Publishes engine events to topic rooms, falling back to push notifications for offline targets.
///
/// Delivery is at-least-once per publish call from the engine's point of view, and best-effort overall: nothing in
/// here can fail the operation that triggered it.
pub struct RealtimeFanout<B, P> {
    db: B,
    presence: PresenceRegistry,
    push: Arc<P>,
}

impl<B: Clone, P> Clone for RealtimeFanout<B, P> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), presence: self.presence.clone(), push: Arc::clone(&self.push) }
    }
}

impl<B, P> RealtimeFanout<B, P>
where
    B: PushTokenStore,
    P: PushDelivery,
{
    pub fn new(db: B, presence: PresenceRegistry, push: P) -> Self {
        Self { db, presence, push: Arc::new(push) }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Sends `message` to every topic in `targets`. Each connected actor receives it at most once.
    ///
    /// Direct topics (a specific operator or client) whose actor is offline get a push notification instead, if the
    /// message has a push form.
    pub async fn publish(&self, targets: &TargetSet, message: RealtimeMessage) -> FanoutReport {
        let mut report = FanoutReport::default();
        let mut reached = HashSet::new();
        let mut offline = Vec::new();
        for topic in targets.topics() {
            for key in self.presence.recipients(topic) {
                if !reached.insert(key) {
                    continue;
                }
                if self.presence.send(key, message.clone()) {
                    report.delivered += 1;
                } else if matches!(topic, Topic::Operator(_) | Topic::Client(_)) {
                    offline.push(key);
                }
            }
        }
        trace!("📡️ '{}' delivered live to {} connection(s)", message.name(), report.delivered);
        for key in offline {
            let Some(notification) = message.push_notification(key.role) else {
                continue;
            };
            report.pushed += 1;
            if let Err(e) = self.push_to_user(key.id, &notification).await {
                report.push_failures += 1;
                warn!("🔔️ Could not push '{}' to user {}: {e}", notification.title, key.id);
            }
        }
        report
    }

    /// Announces a mission change outside (or as part of) the normal transition path.
    ///
    /// Every topic in `targets` gets the compact status event. The full snapshot skips the external-operator
    /// broadcast, which instead receives [`RealtimeMessage::NewMissionAvailable`] while the mission is published and
    /// unassigned.
    pub async fn emit_mission_event(
        &self,
        event: MissionEventType,
        mission: &Mission,
        targets: &TargetSet,
    ) -> FanoutReport {
        let compact = RealtimeMessage::MissionStatusChanged {
            mission_id: mission.id,
            event,
            status: mission.status,
            operator_id: mission.operator_id,
        };
        let mut report = self.publish(targets, compact).await;
        let direct = targets.clone().without(Topic::ExternalOperators);
        report.merge(self.publish(&direct, RealtimeMessage::MissionUpdated(mission.clone())).await);
        let open_to_all = mission.is_unassigned() && mission.status == MissionStatus::Published;
        if targets.contains(&Topic::ExternalOperators) && open_to_all {
            let announce = TargetSet::new().with(Topic::ExternalOperators);
            report.merge(self.publish(&announce, RealtimeMessage::NewMissionAvailable(mission.clone())).await);
        }
        debug!("📡️ Mission {} '{event:?}' fanned out: {report:?}", mission.id);
        report
    }

    /// Sends a message to one actor: live if connected, otherwise as a push notification.
    pub async fn notify(&self, key: ActorKey, message: RealtimeMessage) -> FanoutReport {
        let topic = match key.role {
            Role::Operator => Topic::Operator(key.id),
            Role::Client => Topic::Client(key.id),
            Role::Admin => Topic::Admins,
        };
        if key.role == Role::Admin {
            let mut report = FanoutReport::default();
            if self.presence.send(key, message) {
                report.delivered = 1;
            }
            return report;
        }
        self.publish(&TargetSet::new().with(topic), message).await
    }

    /// Pushes a notification to every token on file for the user, and prunes tokens the provider reports as invalid.
    /// Returns the number of devices the provider accepted.
    pub async fn push_to_user(&self, user_id: i64, notification: &PushNotification) -> Result<usize, PushError> {
        let tokens = self
            .db
            .push_tokens_for(user_id)
            .await
            .map_err(|e| PushError::TokenLookup(e.to_string()))?
            .into_iter()
            .map(|t| t.token)
            .collect::<Vec<_>>();
        if tokens.is_empty() {
            debug!("🔔️ User {user_id} is offline and has no push tokens on file");
            return Ok(0);
        }
        let report = self.push.deliver(notification, &tokens).await?;
        if !report.invalid_tokens.is_empty() {
            match self.db.remove_push_tokens(&report.invalid_tokens).await {
                Ok(n) => info!("🔔️ Pruned {n} stale push token(s) for user {user_id}"),
                Err(e) => warn!("🔔️ Could not prune stale push tokens for user {user_id}: {e}"),
            }
        }
        trace!("🔔️ '{}' pushed to {} device(s) of user {user_id}", notification.title, report.delivered);
        Ok(report.delivered)
    }
}
