use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{MissionId, MissionStatus};

/// The broad category of a [`DispatchError`]. Callers (typically an HTTP layer) map these to user-facing responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or missing input, or a business rule that the caller can fix.
    Validation,
    /// The state machine does not permit the requested edge from the current state.
    InvalidTransition,
    /// A conditional write affected zero rows: another actor got there first.
    Conflict,
    NotFound,
    Forbidden,
    /// A confirm/approve was attempted on something that was already settled.
    AlreadySettled,
    /// Persistence or push delivery failed.
    DependencyUnavailable,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::InvalidTransition => "INVALID_TRANSITION",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::AlreadySettled => "ALREADY_SETTLED",
            ErrorKind::DependencyUnavailable => "DEPENDENCY_UNAVAILABLE",
        };
        f.write_str(s)
    }
}

/// Business-rule rejections. These are all [`ErrorKind::Validation`] errors, but callers often want to tell them
/// apart (e.g. "finish your current job first").
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusinessRule {
    #[error("The operator already has an active mission ({0}). Finish it first.")]
    OperatorBusy(MissionId),
    #[error("The client already has an open mission ({0}).")]
    ClientHasOpenMission(MissionId),
    #[error("The client already has an open mission.")]
    ClientHasOpenMissionUnknown,
    #[error("Requested {requested}, but only {available} is available for withdrawal.")]
    InsufficientBalance { requested: i64, available: i64 },
    #[error("The operator's location is unknown. Share a location before accepting towing missions.")]
    OperatorLocationUnknown,
}

#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Invalid request. {0}")]
    Validation(String),
    #[error("{0}")]
    BusinessRule(#[from] BusinessRule),
    #[error("Mission {mission} cannot move from {from} via '{action}'.")]
    InvalidTransition { mission: MissionId, from: MissionStatus, action: String },
    #[error("Mission {0} was changed by someone else. It may already have been taken.")]
    MissionConflict(MissionId),
    #[error("Conflict. {0}")]
    Conflict(String),
    #[error("The requested mission {0} does not exist")]
    MissionNotFound(MissionId),
    #[error("The requested operator {0} does not exist")]
    OperatorNotFound(i64),
    #[error("The requested transaction {0} does not exist")]
    TransactionNotFound(i64),
    #[error("The requested withdrawal {0} does not exist")]
    WithdrawalNotFound(i64),
    #[error("Forbidden. {0}")]
    Forbidden(String),
    #[error("Already settled. {0}")]
    AlreadySettled(String),
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("The push delivery service is unavailable: {0}")]
    PushUnavailable(String),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::BusinessRule(_) => ErrorKind::Validation,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::MissionConflict(_) | Self::Conflict(_) => ErrorKind::Conflict,
            Self::MissionNotFound(_) |
            Self::OperatorNotFound(_) |
            Self::TransactionNotFound(_) |
            Self::WithdrawalNotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::AlreadySettled(_) => ErrorKind::AlreadySettled,
            Self::DatabaseError(_) | Self::PushUnavailable(_) => ErrorKind::DependencyUnavailable,
        }
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn is_business_rule(&self, rule: &BusinessRule) -> bool {
        matches!(self, Self::BusinessRule(r) if r == rule)
    }
}

impl From<sqlx::Error> for DispatchError {
    fn from(e: sqlx::Error) -> Self {
        DispatchError::DatabaseError(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for DispatchError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        DispatchError::DatabaseError(format!("Migration failed. {e}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conflict_and_busy_operator_are_distinguishable() {
        let taken = DispatchError::MissionConflict(MissionId(7));
        let busy = DispatchError::from(BusinessRule::OperatorBusy(MissionId(3)));
        assert_eq!(taken.kind(), ErrorKind::Conflict);
        assert_eq!(busy.kind(), ErrorKind::Validation);
        assert!(busy.is_business_rule(&BusinessRule::OperatorBusy(MissionId(3))));
        assert_ne!(taken.to_string(), busy.to_string());
    }

    #[test]
    fn database_errors_are_dependency_failures() {
        let err = DispatchError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), ErrorKind::DependencyUnavailable);
    }
}
