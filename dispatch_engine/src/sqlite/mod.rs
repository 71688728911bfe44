//! SQLite backend for the dispatch engine.
//!
//! Migrations live in `migrations/` and are embedded at compile time. [`SCHEMA_VERSION`] must match the version
//! the last migration writes into `schema_descriptor`; [`crate::traits::DispatchDatabase::check_schema_version`]
//! compares the two once at startup.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;

/// The schema version this build reads and writes.
pub const SCHEMA_VERSION: i64 = 1;
