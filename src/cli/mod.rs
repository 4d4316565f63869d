//! Command Line Interface module
//!
//! Commands are grouped the way they are used:
//! - `core`: setting up a store and reading reports (init, report)
//! - `records`: one command per collection (farms, categories, animals,
//!   health, breeding, feeding, finance, tasks)
//! - `management`: the query cache and configuration

pub mod core;
pub mod management;
pub mod records;

pub use self::core::{init, report};
pub use management::{cache, config};
pub use records::{animals, breeding, categories, farms, feeding, finance, health, tasks};

use anyhow::{bail, Result};
use clap::ValueEnum;
use serde::Serialize;

use crate::core::query::state::QueryState;
use crate::error::HerdbookError;

/// How list and show commands print their results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Unwrap a finished query for printing. A query that never started means
/// there is no identity to run it under.
pub(crate) fn require<T>(state: QueryState<T>) -> Result<T> {
    match state {
        QueryState::Ready(data) => Ok(data),
        QueryState::Failed(HerdbookError::Cancelled) => bail!("Interrupted"),
        QueryState::Failed(err) => Err(err.into()),
        QueryState::NotStarted => {
            bail!("No identity configured. Set access_token or user_id in the config, or HERDBOOK_USER_ID")
        }
        QueryState::Loading => bail!("Query did not finish"),
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The signed-in user's id, needed for records that carry an owner.
pub(crate) fn current_user(client: &crate::core::query::QueryClient) -> Result<String> {
    match client.user_id() {
        Some(user_id) => Ok(user_id),
        None => Err(HerdbookError::NotAuthenticated.into()),
    }
}
