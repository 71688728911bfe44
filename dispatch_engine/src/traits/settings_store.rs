use crate::traits::DispatchError;

/// A simple key-value accessor over business configuration (commission, tariffs, radii, scheduler tuning).
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    async fn fetch_setting(&self, key: &str) -> Result<Option<String>, DispatchError>;

    async fn store_setting(&self, key: &str, value: &str) -> Result<(), DispatchError>;
}
