use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Mission, MissionEventType, MissionId, MissionStatus, Role, SettlementTransaction, Withdrawal},
    realtime::PushNotification,
};

/// Everything that travels over a live connection. Serialized as `{"event": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RealtimeMessage {
    /// The compact form of a mission change.
    MissionStatusChanged {
        mission_id: MissionId,
        event: MissionEventType,
        status: MissionStatus,
        operator_id: Option<i64>,
    },
    /// The full mission snapshot after a change.
    MissionUpdated(Mission),
    /// A mission was published and nobody holds it yet. Only sent to external operators.
    NewMissionAvailable(Mission),
    /// An admin assigned the mission to the receiving operator.
    MissionAssigned(Mission),
    OperatorLocation {
        mission_id: MissionId,
        operator_id: i64,
        lat: f64,
        lng: f64,
    },
    TransactionUpdated(SettlementTransaction),
    WithdrawalUpdated(Withdrawal),
    PendingMissionsNearby {
        count: usize,
        zones: Vec<String>,
    },
    /// Sent to a connection right before it is closed because the same actor connected again elsewhere.
    SessionReplaced,
    Shutdown,
}

impl RealtimeMessage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MissionStatusChanged { .. } => "mission_status_changed",
            Self::MissionUpdated(_) => "mission_updated",
            Self::NewMissionAvailable(_) => "new_mission_available",
            Self::MissionAssigned(_) => "mission_assigned",
            Self::OperatorLocation { .. } => "operator_location",
            Self::TransactionUpdated(_) => "transaction_updated",
            Self::WithdrawalUpdated(_) => "withdrawal_updated",
            Self::PendingMissionsNearby { .. } => "pending_missions_nearby",
            Self::SessionReplaced => "session_replaced",
            Self::Shutdown => "shutdown",
        }
    }

    /// The push notification to send instead of this message when a `recipient` of that role is offline.
    ///
    /// `None` means the message is not worth waking a phone for: snapshots that duplicate a compact event, location
    /// pings, connection housekeeping, and status steps the operator either made themselves or already got a
    /// dedicated notification for.
    pub fn push_notification(&self, recipient: Role) -> Option<PushNotification> {
        let mut data = BTreeMap::new();
        data.insert("event".to_string(), self.name().to_string());
        let (title, body) = match self {
            Self::MissionStatusChanged { mission_id, status, .. } => {
                data.insert("mission_id".to_string(), mission_id.value().to_string());
                data.insert("status".to_string(), status.to_string());
                (format!("Mission {mission_id}"), status_text(*status, recipient)?.to_string())
            },
            Self::NewMissionAvailable(mission) => {
                data.insert("mission_id".to_string(), mission.id.value().to_string());
                let body = format!("A {} request is waiting for an operator.", mission.service_kind);
                ("New mission nearby".to_string(), body)
            },
            Self::MissionAssigned(mission) => {
                data.insert("mission_id".to_string(), mission.id.value().to_string());
                ("Mission assigned to you".to_string(), format!("Mission {} has been assigned to you.", mission.id))
            },
            Self::TransactionUpdated(tx) => {
                data.insert("transaction_id".to_string(), tx.id.to_string());
                ("Payment update".to_string(), format!("Payment for mission {} is {}.", tx.mission_id, tx.status))
            },
            Self::WithdrawalUpdated(w) => {
                data.insert("withdrawal_id".to_string(), w.id.to_string());
                ("Withdrawal update".to_string(), format!("Your withdrawal of {} was {}.", w.amount, w.status))
            },
            Self::PendingMissionsNearby { count, .. } => {
                data.insert("count".to_string(), count.to_string());
                ("Missions waiting".to_string(), format!("{count} mission(s) are waiting near you."))
            },
            Self::MissionUpdated(_) | Self::OperatorLocation { .. } | Self::SessionReplaced | Self::Shutdown => {
                return None
            },
        };
        Some(PushNotification { title, body, data })
    }
}

fn status_text(status: MissionStatus, recipient: Role) -> Option<&'static str> {
    let text = match (recipient, status) {
        (Role::Operator, MissionStatus::CancelledByClient) => "The client cancelled the mission.",
        (Role::Operator, MissionStatus::CancelledByAdmin) => "Dispatch cancelled the mission.",
        (Role::Operator, MissionStatus::Completed) => "The mission is complete.",
        (Role::Operator, _) | (Role::Admin, _) => return None,
        (Role::Client, MissionStatus::PendingUnpublished) => "Your request has been received.",
        (Role::Client, MissionStatus::Published) => "Your request is visible to operators.",
        (Role::Client, MissionStatus::Accepted) => "An operator accepted the mission.",
        (Role::Client, MissionStatus::EnRoute) => "The operator is on the way.",
        (Role::Client, MissionStatus::OnSite) => "The operator has arrived.",
        (Role::Client, MissionStatus::Towing) => "Your vehicle is being towed.",
        (Role::Client, MissionStatus::Completed) => "The mission is complete.",
        (Role::Client, MissionStatus::CancelledByClient) => "You cancelled the mission.",
        (Role::Client, MissionStatus::CancelledByAdmin) => "The mission was cancelled.",
    };
    Some(text)
}
