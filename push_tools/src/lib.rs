//! A small client for the push-notification provider (FCM's HTTP API).
//!
//! The dispatch server uses it to reach users who have no live connection. It knows nothing about missions: callers
//! hand it a [`PushMessage`] and a list of device tokens, and get back a [`SendReport`] that says which tokens the
//! provider no longer recognises.
mod api;
mod config;
mod data_objects;
mod error;
mod helpers;

pub use api::PushApi;
pub use config::PushConfig;
pub use data_objects::{PushMessage, SendReport};
pub use error::PushApiError;
pub use helpers::is_stale_token_error;
