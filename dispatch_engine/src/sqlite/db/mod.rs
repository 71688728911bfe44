//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Functions that perform a compare-and-swap are written so that the conditional write is the first statement
//! issued inside a transaction. SQLite then holds the write lock for the rest of the unit, and any reads that
//! follow see a consistent view.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

use crate::db_types::MissionStatus;

pub mod missions;
pub mod operators;
pub mod push_tokens;
pub mod settings;
pub mod transactions;
pub mod withdrawals;

const SQLITE_DB_URL: &str = "sqlite://data/dispatch.db";

pub fn db_url() -> String {
    let result = env::var("TDS_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ TDS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10));
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Renders a list of statuses as a SQL `IN (...)` body. The values come from a closed enum, so inlining them is safe.
pub(crate) fn status_list(statuses: &[MissionStatus]) -> String {
    statuses.iter().map(|s| format!("'{}'", s.as_str())).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_lists_are_quoted() {
        let list = status_list(&[MissionStatus::Accepted, MissionStatus::EnRoute]);
        assert_eq!(list, "'accepted', 'en_route'");
    }
}
