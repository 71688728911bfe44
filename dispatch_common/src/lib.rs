//! Types shared by every crate in the dispatch workspace.
//!
//! * [`Amount`] is the money type used for prices, commissions, balances and withdrawals.
//! * [`Secret`] hides sensitive configuration values from logs.
//! * [`helpers`] contains small parsing helpers for environment-driven configuration.
mod amount;

pub mod helpers;
pub mod op;
mod secret;

pub use amount::{Amount, AmountConversionError, DEFAULT_CURRENCY};
pub use secret::Secret;
