//! Data layer modules
//!
//! - `models`: typed records, payloads and analytics shapes
//! - `database`: the embedded SQLite backend
//! - `procedures`: the aggregation procedures for SQLite

pub mod database;
pub mod models;
pub mod procedures;

pub use database::SqliteBackend;
