//! # Storage contracts
//!
//! The traits in this module define what a storage backend must provide for the dispatch engine to run on it.
//!
//! * [`MissionManagement`] stores missions and their event log. All status changes go through a compare-and-swap
//!   primitive, [`MissionManagement::swap_mission`].
//! * [`OperatorManagement`] stores operator profiles: position, zones and flags.
//! * [`LedgerManagement`] stores settlement transactions, balances and withdrawals.
//! * [`PushTokenStore`] keeps push delivery tokens.
//! * [`SettingsStore`] is the key-value configuration accessor.
//! * [`DispatchDatabase`] ties them together.
mod data_objects;
mod dispatch_database;
mod errors;
mod ledger_management;
mod mission_management;
mod operator_management;
mod push_tokens;
mod settings_store;

pub use data_objects::{
    MissionQueryFilter,
    MissionSwap,
    MissionSwapped,
    MissionTimestamp,
    OperatorChange,
    OperatorGuard,
    SettlementOpened,
};
pub use dispatch_database::DispatchDatabase;
pub use errors::{BusinessRule, DispatchError, ErrorKind};
pub use ledger_management::LedgerManagement;
pub use mission_management::MissionManagement;
pub use operator_management::OperatorManagement;
pub use push_tokens::PushTokenStore;
pub use settings_store::SettingsStore;
