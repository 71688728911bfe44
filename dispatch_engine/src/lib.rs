//! Mission Dispatch Engine
//!
//! The dispatch engine coordinates roadside-assistance missions between clients, field operators and administrators.
//! It prices requests, matches them to nearby operators, enforces a single authoritative lifecycle per mission, pushes
//! every change to the parties involved in real time, and settles the money afterwards. It is provider-agnostic: the
//! push provider and the HTTP surface live in other crates.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@traits`] and [`mod@sqlite`]). The traits define what a backend must provide, most importantly a
//!    compare-and-swap primitive for mission status changes. SQLite is the supported backend. The data types used in
//!    storage are defined in [`mod@db_types`] and are public.
//! 2. Realtime ([`mod@realtime`]): the presence registry of connected actors and the fan-out that routes events to
//!    them, with a push-notification fallback for offline users.
//! 3. The public API ([`mod@dispatch_api`]): missions, settlement, alerts and operators.
//!
//! The engine also emits events when missions complete, transactions are confirmed and withdrawals are processed.
//! A simple Actor framework is used so that you can easily hook into these events and perform custom actions.
pub mod db_types;
pub mod dispatch_api;
pub mod events;
pub mod helpers;
pub mod realtime;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use dispatch_api::{
    alert_api::{AlertApi, AlertReport},
    mission_flow_api::MissionFlowApi,
    operator_api::{OperatorApi, OperatorPresence},
    settlement_api::SettlementApi,
    transitions::MissionAction,
    CandidateMission,
    DispatchSettings,
    PublishRequest,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
