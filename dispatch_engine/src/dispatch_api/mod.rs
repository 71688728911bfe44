//! # Dispatch engine public API
//!
//! The `dispatch_api` module exposes the programmatic API of the dispatch engine. Each API is a thin, cloneable
//! handle over a storage backend and the realtime fan-out, so a process can create the ones it needs and share them
//! between request handlers and background workers.
//!
//! * [`mission_flow_api`] drives missions through their lifecycle: creation and pricing, publishing, soft
//!   assignment, the single-acceptance guard, transit states, cancellation, matching and auto-cancel.
//! * [`settlement_api`] handles payment confirmation, transaction confirmation (commission and operator credit) and
//!   withdrawals.
//! * [`alert_api`] sends idle operators reminders about pending missions in their zones.
//! * [`operator_api`] manages operator profiles, live sessions, push tokens and presence queries.
//!
//! Business configuration is read through [`DispatchSettings`] on every call that needs it, so a changed commission
//! or tariff applies to the next operation without a restart.
//!
//! # API usage
//!
//! ```rust,ignore
//! use dispatch_engine::{
//!     events::EventProducers,
//!     realtime::{LogOnlyPush, PresenceRegistry, RealtimeFanout},
//!     MissionFlowApi,
//!     SqliteDatabase,
//! };
//! let db = SqliteDatabase::new_with_url("sqlite://data/dispatch.db", 5).await?;
//! let fanout = RealtimeFanout::new(db.clone(), PresenceRegistry::new(), LogOnlyPush);
//! let missions = MissionFlowApi::new(db, fanout, EventProducers::default());
//! let mission = missions.accept(Actor::operator(7), MissionId(42)).await?;
//! ```
mod access;
pub mod alert_api;
pub mod mission_flow_api;
pub mod mission_objects;
pub mod operator_api;
pub mod settings;
pub mod settlement_api;
pub mod transitions;

pub use mission_objects::{CandidateMission, PublishRequest};
pub use settings::DispatchSettings;
