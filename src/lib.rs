//! herdbook: livestock records over a cached, typed data-access layer.
//!
//! Queries go through [`core::query::QueryClient`], which caches results by
//! [`core::query::QueryKey`], shares concurrent fetches, and drops cached
//! entries when a mutation names them. Backends implement
//! [`core::services::Backend`]: a PostgREST endpoint or a local SQLite file.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod signal_handler;
pub mod utils;
