//! The mission lifecycle as a closed set of actions and an explicit `(status, action) -> status` table.
//!
//! ```text
//! pending_unpublished -> published -> accepted -> en_route -> on_site -> [towing] -> completed
//! ```
//!
//! Cancellation branches off every open status (clients are limited to the early ones). `towing` only exists between
//! `on_site` and `completed`, and only for towing missions.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Mission, MissionEventType, MissionStatus, Role, ServiceKind},
    traits::DispatchError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionAction {
    Publish,
    /// Soft assignment of a published mission to one operator.
    Assign,
    /// The assigned operator hands a published mission back.
    Refuse,
    Accept,
    StartRoute,
    ArriveOnSite,
    StartTowing,
    Complete,
    CancelByClient,
    CancelByAdmin,
    /// Auto-cancel of a stale, unmatched mission by the scheduler.
    Timeout,
}

impl MissionAction {
    /// The role allowed to perform the action. `None` for system actions.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Publish | Self::Assign | Self::CancelByAdmin => Some(Role::Admin),
            Self::Refuse | Self::Accept => Some(Role::Operator),
            Self::StartRoute | Self::ArriveOnSite | Self::StartTowing | Self::Complete => Some(Role::Operator),
            Self::CancelByClient => Some(Role::Client),
            Self::Timeout => None,
        }
    }

    /// The event appended to the mission log when the action applies.
    pub fn event_type(&self, new_status: MissionStatus) -> MissionEventType {
        match self {
            Self::Assign => MissionEventType::Assigned,
            Self::Refuse => MissionEventType::Refused,
            _ => MissionEventType::for_status(new_status),
        }
    }

    /// The operator action that moves an active mission into `target`.
    pub fn advance_to(target: MissionStatus) -> Result<Self, DispatchError> {
        match target {
            MissionStatus::EnRoute => Ok(Self::StartRoute),
            MissionStatus::OnSite => Ok(Self::ArriveOnSite),
            MissionStatus::Towing => Ok(Self::StartTowing),
            MissionStatus::Completed => Ok(Self::Complete),
            other => Err(DispatchError::validation(format!(
                "'{other}' is not a target an operator can advance to. Use en_route, on_site, towing or completed."
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Assign => "assign",
            Self::Refuse => "refuse",
            Self::Accept => "accept",
            Self::StartRoute => "start_route",
            Self::ArriveOnSite => "arrive_on_site",
            Self::StartTowing => "start_towing",
            Self::Complete => "complete",
            Self::CancelByClient => "cancel_by_client",
            Self::CancelByAdmin => "cancel_by_admin",
            Self::Timeout => "timeout",
        }
    }
}

impl Display for MissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks up the edge for `action` from `current`. Returns `None` if the lifecycle does not allow it.
pub fn next_status(current: MissionStatus, action: MissionAction, kind: ServiceKind) -> Option<MissionStatus> {
    use MissionAction as A;
    use MissionStatus as S;
    match (current, action) {
        (S::PendingUnpublished, A::Publish) => Some(S::Published),
        (S::Published, A::Assign | A::Refuse) => Some(S::Published),
        (S::Published, A::Accept) => Some(S::Accepted),
        (S::Accepted, A::StartRoute) => Some(S::EnRoute),
        (S::EnRoute, A::ArriveOnSite) => Some(S::OnSite),
        (S::OnSite, A::StartTowing) if kind.is_towing() => Some(S::Towing),
        (S::OnSite, A::Complete) if !kind.is_towing() => Some(S::Completed),
        (S::Towing, A::Complete) => Some(S::Completed),
        (S::PendingUnpublished | S::Published | S::Accepted, A::CancelByClient) => Some(S::CancelledByClient),
        (s, A::CancelByAdmin) if !s.is_terminal() => Some(S::CancelledByAdmin),
        (S::Published, A::Timeout) => Some(S::CancelledByAdmin),
        _ => None,
    }
}

/// Like [`next_status`], but as a typed failure carrying enough context for the caller.
pub fn check_transition(mission: &Mission, action: MissionAction) -> Result<MissionStatus, DispatchError> {
    next_status(mission.status, action, mission.service_kind).ok_or_else(|| DispatchError::InvalidTransition {
        mission: mission.id,
        from: mission.status,
        action: action.to_string(),
    })
}
