//! Management commands: the query cache and configuration.

pub mod cache;
pub mod config;
