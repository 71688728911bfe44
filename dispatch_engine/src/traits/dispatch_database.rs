use crate::traits::{
    DispatchError,
    LedgerManagement,
    MissionManagement,
    OperatorManagement,
    PushTokenStore,
    SettingsStore,
};

/// The highest-level contract for a storage backend of the dispatch engine.
#[allow(async_fn_in_trait)]
pub trait DispatchDatabase:
    Clone + MissionManagement + OperatorManagement + LedgerManagement + PushTokenStore + SettingsStore
{
    /// The URL of the database
    fn url(&self) -> &str;

    /// Checks that the schema the backend is talking to is the one this build expects.
    async fn check_schema_version(&self) -> Result<i64, DispatchError>;

    async fn close(&mut self) -> Result<(), DispatchError>;
}
