use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub use dispatch_common::Amount;

use crate::helpers::GeoPoint;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    pub kind: &'static str,
    pub value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Operator,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Operator => write!(f, "operator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "operator" => Ok(Self::Operator),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError::new("role", s)),
        }
    }
}

//--------------------------------------         Actor         ---------------------------------------------------------
/// The authenticated caller of an engine operation, as supplied by the authorization collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn client(id: i64) -> Self {
        Self { id, role: Role::Client }
    }

    pub fn operator(id: i64) -> Self {
        Self { id, role: Role::Operator }
    }

    pub fn admin(id: i64) -> Self {
        Self { id, role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.role, self.id)
    }
}

//--------------------------------------       MissionId       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct MissionId(pub i64);

impl MissionId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for MissionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Display for MissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------      ServiceKind      ---------------------------------------------------------
/// The catalog of services a client can request. Only [`ServiceKind::Towing`] is priced by distance and requires a
/// destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Towing,
    BatteryBoost,
    TireChange,
    FuelDelivery,
    Lockout,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] =
        [Self::Towing, Self::BatteryBoost, Self::TireChange, Self::FuelDelivery, Self::Lockout];

    pub fn is_towing(&self) -> bool {
        matches!(self, Self::Towing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Towing => "towing",
            Self::BatteryBoost => "battery_boost",
            Self::TireChange => "tire_change",
            Self::FuelDelivery => "fuel_delivery",
            Self::Lockout => "lockout",
        }
    }
}

impl Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|k| k.as_str() == s).ok_or_else(|| ConversionError::new("service kind", s))
    }
}

//--------------------------------------     MissionStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    /// Created by the client, waiting for an admin to publish it.
    PendingUnpublished,
    /// Visible to eligible operators. May be soft-assigned to one operator.
    Published,
    Accepted,
    EnRoute,
    OnSite,
    /// Only reachable for towing missions.
    Towing,
    Completed,
    CancelledByClient,
    CancelledByAdmin,
}

impl MissionStatus {
    pub const ALL: [MissionStatus; 9] = [
        Self::PendingUnpublished,
        Self::Published,
        Self::Accepted,
        Self::EnRoute,
        Self::OnSite,
        Self::Towing,
        Self::Completed,
        Self::CancelledByClient,
        Self::CancelledByAdmin,
    ];

    /// Statuses in which an operator holds the mission and is expected to work on it.
    pub const ACTIVE: [MissionStatus; 4] = [Self::Accepted, Self::EnRoute, Self::OnSite, Self::Towing];

    /// Every status that is not terminal.
    pub const OPEN: [MissionStatus; 6] =
        [Self::PendingUnpublished, Self::Published, Self::Accepted, Self::EnRoute, Self::OnSite, Self::Towing];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::CancelledByClient | Self::CancelledByAdmin)
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingUnpublished => "pending_unpublished",
            Self::Published => "published",
            Self::Accepted => "accepted",
            Self::EnRoute => "en_route",
            Self::OnSite => "on_site",
            Self::Towing => "towing",
            Self::Completed => "completed",
            Self::CancelledByClient => "cancelled_by_client",
            Self::CancelledByAdmin => "cancelled_by_admin",
        }
    }
}

impl Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| ConversionError::new("mission status", s))
    }
}

//--------------------------------------        Mission        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub client_id: i64,
    pub operator_id: Option<i64>,
    pub service_kind: ServiceKind,
    pub status: MissionStatus,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    /// City/district label used to group pending missions for operator alerts.
    pub zone: Option<String>,
    /// Route distance used for the published price, in km.
    pub distance_km: Option<f64>,
    pub estimated_price: Amount,
    /// Set exactly once, when an operator accepts the mission.
    pub final_price: Option<Amount>,
    pub currency: String,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Mission {
    pub fn origin(&self) -> GeoPoint {
        GeoPoint::new(self.origin_lat, self.origin_lng)
    }

    pub fn destination(&self) -> Option<GeoPoint> {
        match (self.destination_lat, self.destination_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }

    pub fn is_assigned_to(&self, operator_id: i64) -> bool {
        self.operator_id == Some(operator_id)
    }

    pub fn is_unassigned(&self) -> bool {
        self.operator_id.is_none()
    }

    /// The amount the client owes: the locked price if the mission was accepted, otherwise the published estimate.
    pub fn billable_price(&self) -> Amount {
        self.final_price.unwrap_or(self.estimated_price)
    }
}

//--------------------------------------      NewMission       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMission {
    pub client_id: i64,
    pub service_kind: ServiceKind,
    pub origin: GeoPoint,
    pub destination: Option<GeoPoint>,
    pub zone: Option<String>,
    pub currency: String,
}

impl NewMission {
    pub fn new(client_id: i64, service_kind: ServiceKind, origin: GeoPoint) -> Self {
        Self {
            client_id,
            service_kind,
            origin,
            destination: None,
            zone: None,
            currency: dispatch_common::DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_destination(mut self, destination: GeoPoint) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_zone<S: Into<String>>(mut self, zone: S) -> Self {
        self.zone = Some(zone.into());
        self
    }
}

//--------------------------------------   MissionEventType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MissionEventType {
    Created,
    Published,
    Assigned,
    Refused,
    Accepted,
    EnRoute,
    OnSite,
    Towing,
    Completed,
    CancelledByClient,
    CancelledByAdmin,
    PhotoAdded,
    Deleted,
}

impl MissionEventType {
    /// The event type that records a move into `status`.
    pub fn for_status(status: MissionStatus) -> Self {
        match status {
            MissionStatus::PendingUnpublished => Self::Created,
            MissionStatus::Published => Self::Published,
            MissionStatus::Accepted => Self::Accepted,
            MissionStatus::EnRoute => Self::EnRoute,
            MissionStatus::OnSite => Self::OnSite,
            MissionStatus::Towing => Self::Towing,
            MissionStatus::Completed => Self::Completed,
            MissionStatus::CancelledByClient => Self::CancelledByClient,
            MissionStatus::CancelledByAdmin => Self::CancelledByAdmin,
        }
    }
}

//--------------------------------------     MissionEvent      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct MissionEvent {
    pub id: i64,
    pub mission_id: MissionId,
    pub event_type: MissionEventType,
    pub actor_id: Option<i64>,
    /// Free-form JSON metadata.
    pub metadata: String,
    pub created_at: DateTime<Utc>,
}

impl MissionEvent {
    pub fn metadata_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.metadata).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMissionEvent {
    pub mission_id: MissionId,
    pub event_type: MissionEventType,
    pub actor_id: Option<i64>,
    pub metadata: serde_json::Value,
}

impl NewMissionEvent {
    pub fn new(mission_id: MissionId, event_type: MissionEventType) -> Self {
        Self { mission_id, event_type, actor_id: None, metadata: serde_json::Value::Object(Default::default()) }
    }

    pub fn by(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

//--------------------------------------    OperatorProfile    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OperatorProfile {
    pub user_id: i64,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Comma-separated zone labels (city/district).
    pub zones: String,
    pub available: bool,
    /// Dedicated fleet operators receive missions by direct assignment only.
    pub internal: bool,
    pub alerts_enabled: bool,
    pub balance: Amount,
    pub pending_balance: Amount,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OperatorProfile {
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }

    pub fn zone_list(&self) -> Vec<String> {
        split_zones(&self.zones)
    }

    pub fn is_external(&self) -> bool {
        !self.internal
    }
}

/// Normalises a comma-separated list of zone labels: trimmed, lower-cased, empties removed.
pub fn split_zones(zones: &str) -> Vec<String> {
    zones.split(',').map(|z| z.trim().to_lowercase()).filter(|z| !z.is_empty()).collect()
}

#[derive(Debug, Clone, Default)]
pub struct NewOperator {
    pub user_id: i64,
    pub position: Option<GeoPoint>,
    pub zones: Vec<String>,
    pub internal: bool,
}

impl NewOperator {
    pub fn new(user_id: i64) -> Self {
        Self { user_id, ..Default::default() }
    }

    pub fn at(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }

    pub fn in_zones(mut self, zones: &[&str]) -> Self {
        self.zones = zones.iter().map(|z| z.to_string()).collect();
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }
}

/// Partial update of operator flags. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct OperatorFlags {
    pub available: Option<bool>,
    pub internal: Option<bool>,
    pub alerts_enabled: Option<bool>,
    pub zones: Option<Vec<String>>,
}

impl OperatorFlags {
    pub fn is_empty(&self) -> bool {
        self.available.is_none() && self.internal.is_none() && self.alerts_enabled.is_none() && self.zones.is_none()
    }

    pub fn with_available(mut self, available: bool) -> Self {
        self.available = Some(available);
        self
    }

    pub fn with_internal(mut self, internal: bool) -> Self {
        self.internal = Some(internal);
        self
    }

    pub fn with_alerts(mut self, enabled: bool) -> Self {
        self.alerts_enabled = Some(enabled);
        self
    }

    pub fn with_zones(mut self, zones: Vec<String>) -> Self {
        self.zones = Some(zones);
        self
    }
}

//--------------------------------------   TransactionStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

//-------------------------------------- SettlementTransaction ---------------------------------------------------------
/// The money owed for one completed mission, and the operator's share of it once confirmed.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SettlementTransaction {
    pub id: i64,
    pub operator_id: i64,
    pub mission_id: MissionId,
    pub amount: Amount,
    pub currency: String,
    /// Snapshot of the commission percent in force when the transaction was opened.
    pub commission_percent: f64,
    pub commission_amount: Option<Amount>,
    pub net_amount: Option<Amount>,
    pub status: TransactionStatus,
    pub client_confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SettlementTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.status == TransactionStatus::Confirmed
    }
}

/// The values captured when a transaction is opened for a mission.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementSnapshot {
    pub operator_id: i64,
    pub amount: Amount,
    pub currency: String,
    pub commission_percent: f64,
}

impl SettlementSnapshot {
    /// The net the operator can expect if the transaction is confirmed with the snapshotted commission.
    pub fn expected_net(&self) -> Amount {
        commission_split(self.amount, self.commission_percent).1
    }
}

/// Splits a gross amount into `(commission, net)`.
pub fn commission_split(amount: Amount, commission_percent: f64) -> (Amount, Amount) {
    let commission = amount.percent(commission_percent);
    (commission, amount - commission)
}

//--------------------------------------   WithdrawalStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Approved => write!(f, "approved"),
            WithdrawalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: i64,
    pub operator_id: i64,
    pub amount: Amount,
    pub currency: String,
    pub method: String,
    pub phone: Option<String>,
    pub status: WithdrawalStatus,
    pub processed_by: Option<i64>,
    pub processed_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub operator_id: i64,
    pub amount: Amount,
    pub currency: String,
    /// Payout method, e.g. "orange_money" or "bank_transfer".
    pub method: String,
    pub phone: Option<String>,
}

impl NewWithdrawal {
    pub fn new<S: Into<String>>(operator_id: i64, amount: Amount, method: S) -> Self {
        Self {
            operator_id,
            amount,
            currency: dispatch_common::DEFAULT_CURRENCY.to_string(),
            method: method.into(),
            phone: None,
        }
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalDecision {
    Approve,
    Reject,
}

impl WithdrawalDecision {
    pub fn status(&self) -> WithdrawalStatus {
        match self {
            Self::Approve => WithdrawalStatus::Approved,
            Self::Reject => WithdrawalStatus::Rejected,
        }
    }
}

//--------------------------------------     LedgerSummary     ---------------------------------------------------------
/// An operator's financial position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub operator_id: i64,
    pub balance: Amount,
    pub pending_balance: Amount,
    pub confirmed_net: Amount,
    pub approved_withdrawals: Amount,
}

impl LedgerSummary {
    /// What the operator may still withdraw: confirmed earnings minus approved withdrawals.
    pub fn available(&self) -> Amount {
        self.confirmed_net - self.approved_withdrawals
    }
}

//--------------------------------------       PushToken       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PushToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub platform: Option<String>,
    pub created_at: DateTime<Utc>,
}
