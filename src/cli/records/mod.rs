//! One command per collection. Each has list, show, add, update and delete
//! subcommands over the matching record hook.

pub mod animals;
pub mod breeding;
pub mod categories;
pub mod farms;
pub mod feeding;
pub mod finance;
pub mod health;
pub mod tasks;

use anyhow::Result;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{print_json, require, OutputFormat};
use crate::core::records::RecordHook;

/// Print one record as `field: value` lines, or as JSON.
pub(crate) async fn show_record<H, F>(
    hook: &H,
    id: &str,
    format: OutputFormat,
    cancel: &CancellationToken,
    describe: F,
) -> Result<()>
where
    H: RecordHook,
    H::Record: Serialize,
    F: Fn(&H::Record) -> Vec<(&'static str, String)>,
{
    let record = require(hook.get(id, cancel).await)?;
    match format {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Table => print_fields(&describe(&record)),
    }
    Ok(())
}

pub(crate) fn print_fields(fields: &[(&'static str, String)]) {
    for (name, value) in fields {
        if !value.is_empty() {
            println!("  {:<22} {}", format!("{}:", name), value);
        }
    }
}

pub(crate) async fn delete_record<H: RecordHook>(hook: &H, id: &str, cancel: &CancellationToken) -> Result<()> {
    hook.delete(id, cancel).await?;
    println!("🗑️  Deleted {}", id);
    Ok(())
}

pub(crate) fn saved<T: Serialize>(verb: &str, id: &str, record: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            println!("✅ {} {}", verb, id);
            Ok(())
        }
    }
}
