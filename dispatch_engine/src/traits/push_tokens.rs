use crate::{db_types::PushToken, traits::DispatchError};

/// Delivery tokens for push notifications. A user may have several (one per device).
#[allow(async_fn_in_trait)]
pub trait PushTokenStore {
    /// Registers a token for the user. Registering a known token again moves it to that user.
    async fn register_push_token(
        &self,
        user_id: i64,
        token: &str,
        platform: Option<&str>,
    ) -> Result<PushToken, DispatchError>;

    async fn push_tokens_for(&self, user_id: i64) -> Result<Vec<PushToken>, DispatchError>;

    /// Deletes the given tokens, whoever they belong to. Returns the number of tokens removed.
    async fn remove_push_tokens(&self, tokens: &[String]) -> Result<u64, DispatchError>;
}
