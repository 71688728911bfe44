use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{
    Amount,
    Mission,
    MissionId,
    MissionStatus,
    NewMissionEvent,
    ServiceKind,
    SettlementSnapshot,
    SettlementTransaction,
};

/// What the operator column must look like for a [`MissionSwap`] to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorGuard {
    Any,
    Unassigned,
    Is(i64),
    /// Unassigned, or already (soft-)assigned to the given operator.
    UnassignedOr(i64),
}

/// How a [`MissionSwap`] changes the operator column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorChange {
    Keep,
    Assign(i64),
    Release,
}

/// Which lifecycle timestamp a [`MissionSwap`] stamps with the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionTimestamp {
    Published,
    Accepted,
    Finished,
}

/// A compare-and-swap on a mission row.
///
/// The swap only applies if the mission is currently in `expected_status` and its operator column satisfies
/// `operator_guard`. When it applies, the new values are written, `event` is appended to the mission log and (if
/// given) a settlement transaction is opened, all in one atomic unit. When it does not apply, nothing is written.
#[derive(Debug, Clone)]
pub struct MissionSwap {
    pub mission_id: MissionId,
    pub expected_status: MissionStatus,
    pub operator_guard: OperatorGuard,
    pub new_status: MissionStatus,
    pub operator_change: OperatorChange,
    pub estimated_price: Option<Amount>,
    pub distance_km: Option<f64>,
    /// Written with `COALESCE`, so a locked price is never overwritten.
    pub final_price: Option<Amount>,
    pub stamp: Option<MissionTimestamp>,
    pub cancel_reason: Option<String>,
    /// If set, the swap is rolled back when this operator holds another active mission.
    pub require_idle_operator: Option<i64>,
    pub event: NewMissionEvent,
    pub open_settlement: Option<SettlementSnapshot>,
}

impl MissionSwap {
    pub fn new(
        mission_id: MissionId,
        expected_status: MissionStatus,
        new_status: MissionStatus,
        event: NewMissionEvent,
    ) -> Self {
        Self {
            mission_id,
            expected_status,
            operator_guard: OperatorGuard::Any,
            new_status,
            operator_change: OperatorChange::Keep,
            estimated_price: None,
            distance_km: None,
            final_price: None,
            stamp: None,
            cancel_reason: None,
            require_idle_operator: None,
            event,
            open_settlement: None,
        }
    }

    pub fn guard_operator(mut self, guard: OperatorGuard) -> Self {
        self.operator_guard = guard;
        self
    }

    pub fn change_operator(mut self, change: OperatorChange) -> Self {
        self.operator_change = change;
        self
    }

    pub fn with_estimate(mut self, price: Amount, distance_km: Option<f64>) -> Self {
        self.estimated_price = Some(price);
        self.distance_km = distance_km;
        self
    }

    pub fn lock_price(mut self, price: Amount) -> Self {
        self.final_price = Some(price);
        self
    }

    pub fn stamp(mut self, stamp: MissionTimestamp) -> Self {
        self.stamp = Some(stamp);
        self
    }

    pub fn with_cancel_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.cancel_reason = Some(reason.into());
        self
    }

    pub fn require_idle(mut self, operator_id: i64) -> Self {
        self.require_idle_operator = Some(operator_id);
        self
    }

    pub fn open_settlement(mut self, snapshot: SettlementSnapshot) -> Self {
        self.open_settlement = Some(snapshot);
        self
    }
}

/// The result of a successful [`MissionSwap`].
#[derive(Debug, Clone)]
pub struct MissionSwapped {
    pub old_status: MissionStatus,
    pub mission: Mission,
    /// The settlement transaction opened by the swap, if one was requested and did not exist yet.
    pub transaction: Option<SettlementTransaction>,
}

impl Display for MissionSwapped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mission {} moved from {} to {}", self.mission.id, self.old_status, self.mission.status)
    }
}

/// Result of opening (or re-opening) the settlement transaction for a mission.
#[derive(Debug, Clone)]
pub struct SettlementOpened {
    pub transaction: SettlementTransaction,
    /// `false` if the transaction already existed.
    pub created: bool,
}

/// Criteria for [`crate::traits::MissionManagement::search_missions`]. Results are ordered by `created_at`,
/// ascending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionQueryFilter {
    pub statuses: Vec<MissionStatus>,
    pub client_id: Option<i64>,
    pub operator_id: Option<i64>,
    pub service_kind: Option<ServiceKind>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl MissionQueryFilter {
    pub fn with_status(mut self, status: MissionStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_client_id(mut self, client_id: i64) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_operator_id(mut self, operator_id: i64) -> Self {
        self.operator_id = Some(operator_id);
        self
    }

    pub fn with_service_kind(mut self, kind: ServiceKind) -> Self {
        self.service_kind = Some(kind);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() &&
            self.client_id.is_none() &&
            self.operator_id.is_none() &&
            self.service_kind.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}
