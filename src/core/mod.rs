//! Core functionality modules
//!
//! - `query`: the generic data-access layer (keys, filters, state, client)
//! - `services`: the backend contract and the hosted REST backend
//! - `data`: typed models and the embedded SQLite backend
//! - `infrastructure`: cross-cutting concerns (query cache, session)
//! - `records`: per-entity hooks and analytics

pub mod data;
pub mod infrastructure;
pub mod query;
pub mod records;
pub mod services;

// Re-export commonly used types for convenience
pub use data::SqliteBackend;
pub use query::{QueryClient, QueryKey, QueryState};
pub use services::{Backend, RestBackend};
