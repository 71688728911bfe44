use std::fmt::Display;

use crate::db_types::{Mission, MissionId};

/// A delivery "room". Topics are derived from actor role, actor id and mission id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every connected admin.
    Admins,
    /// Every connected external operator. Only used to announce new unassigned missions.
    ExternalOperators,
    Operator(i64),
    Client(i64),
    /// Anyone watching one mission's live updates.
    Mission(MissionId),
}

impl Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Admins => write!(f, "admins"),
            Topic::ExternalOperators => write!(f, "operators:external"),
            Topic::Operator(id) => write!(f, "operator:{id}"),
            Topic::Client(id) => write!(f, "client:{id}"),
            Topic::Mission(id) => write!(f, "mission:{}", id.value()),
        }
    }
}

/// An ordered, duplicate-free set of topics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    topics: Vec<Topic>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The deterministic topic set for a mission change: admins, the assigned operator (if any), the client and the
    /// mission's own topic. If `announce` is true and the mission is unassigned, external operators are added.
    pub fn for_mission(mission: &Mission, announce: bool) -> Self {
        let mut targets = Self::new().with(Topic::Admins);
        if let Some(operator_id) = mission.operator_id {
            targets = targets.with(Topic::Operator(operator_id));
        }
        targets = targets.with(Topic::Client(mission.client_id)).with(Topic::Mission(mission.id));
        if announce && mission.is_unassigned() {
            targets = targets.with(Topic::ExternalOperators);
        }
        targets
    }

    pub fn with(mut self, topic: Topic) -> Self {
        if !self.topics.contains(&topic) {
            self.topics.push(topic);
        }
        self
    }

    pub fn without(mut self, topic: Topic) -> Self {
        self.topics.retain(|t| *t != topic);
        self
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.topics.contains(topic)
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{Amount, MissionStatus, ServiceKind};

    fn mission(operator_id: Option<i64>) -> Mission {
        let now = Utc::now();
        Mission {
            id: MissionId(12),
            client_id: 5,
            operator_id,
            service_kind: ServiceKind::Towing,
            status: MissionStatus::Published,
            origin_lat: 12.62,
            origin_lng: -8.0,
            destination_lat: Some(12.65),
            destination_lng: Some(-8.05),
            zone: None,
            distance_km: None,
            estimated_price: Amount::from(10_000),
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
    fn unassigned_missions_are_announced_to_external_operators() {
        let targets = TargetSet::for_mission(&mission(None), true);
        assert_eq!(targets.topics(), &[
            Topic::Admins,
            Topic::Client(5),
            Topic::Mission(MissionId(12)),
            Topic::ExternalOperators
        ]);
    }

    #[test]
    fn assigned_missions_target_their_operator_only() {
        let targets = TargetSet::for_mission(&mission(Some(8)), true);
        assert!(targets.contains(&Topic::Operator(8)));
        assert!(!targets.contains(&Topic::ExternalOperators));
        let targets = targets.with(Topic::Admins).without(Topic::Client(5));
        assert_eq!(targets.topics().len(), 3);
    }
}
