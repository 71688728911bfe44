//! # Mission dispatch server
//! This crate hosts the process around the dispatch engine. It is responsible for:
//! * Applying database migrations and checking the schema version on startup.
//! * Delivering push notifications to offline users (see [push](push/index.html)).
//! * Running the background workers: mission expiry and pending-mission alerts.
//! * Serving the presence dashboards.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/presence/admins`: The ids of connected admins.
//! * `/presence/operators`: Connected operators and whether they are busy.
//! * `/presence/operators/{id}`: Whether one operator is connected.
pub mod alert_worker;
pub mod cli;
pub mod config;
pub mod errors;
pub mod expiry_worker;
pub mod push;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
