use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use super::{delete_record, saved, show_record};
use crate::cli::{print_json, require, OutputFormat};
use crate::core::data::models::{FeedingRecord, FeedingRecordPatch, NewFeedingRecord};
use crate::core::records::{FeedingRecords, RecordHook};
use crate::services::Services;
use crate::utils::table::{opt, Table};

#[derive(Args)]
pub struct FeedingArgs {
    #[command(subcommand)]
    command: FeedingCommands,
}

#[derive(Subcommand)]
enum FeedingCommands {
    /// Feeding log of an animal, newest first
    List {
        animal: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show one feeding record
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Log a feeding
    Add {
        animal: String,
        /// Hay, pellets, silage...
        #[arg(short, long)]
        feed: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        quantity: Option<f64>,
        /// Unit for --quantity (default kg)
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        cost: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Change fields of a feeding record
    Update {
        id: String,
        #[arg(short, long)]
        feed: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        quantity: Option<f64>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        cost: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Delete a feeding record
    Delete { id: String },
}

pub async fn execute(args: FeedingArgs, services: &Services) -> Result<()> {
    let cancel = services.cancel_token();
    let client = services.client();

    match args.command {
        FeedingCommands::List { animal, format } => {
            let records = require(FeedingRecords::new(client, Some(&animal)).list(&cancel).await)?;
            match format {
                OutputFormat::Json => print_json(&records)?,
                OutputFormat::Table => print_table(&records),
            }
        }

        FeedingCommands::Show { id, format } => {
            show_record(&FeedingRecords::new(client, None), &id, format, &cancel, describe).await?;
        }

        FeedingCommands::Add { animal, feed, date, quantity, unit, cost, notes, format } => {
            let new = NewFeedingRecord {
                animal_id: animal.clone(),
                feed_type: feed,
                feeding_date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                quantity,
                quantity_unit: unit,
                cost,
                notes,
            };
            let record = FeedingRecords::new(client, Some(&animal)).create(&new, &cancel).await?;
            saved("Logged feeding", &record.id, &record, format)?;
        }

        FeedingCommands::Update { id, feed, date, quantity, unit, cost, notes, format } => {
            let patch = FeedingRecordPatch {
                feed_type: feed,
                quantity,
                quantity_unit: unit,
                feeding_date: date,
                cost,
                notes,
            };
            let record = FeedingRecords::new(client, None).update(&id, &patch, &cancel).await?;
            saved("Updated feeding", &record.id, &record, format)?;
        }

        FeedingCommands::Delete { id } => delete_record(&FeedingRecords::new(client, None), &id, &cancel).await?,
    }

    Ok(())
}

fn print_table(records: &[FeedingRecord]) {
    if records.is_empty() {
        println!("No feedings logged");
        return;
    }
    let mut table = Table::new(["ID", "Date", "Feed", "Quantity", "Cost"]);
    for record in records {
        let quantity = record
            .quantity
            .map(|q| format!("{} {}", q, record.quantity_unit))
            .unwrap_or_default();
        table.row([
            record.id.clone(),
            record.feeding_date.to_string(),
            record.feed_type.clone(),
            quantity,
            opt(&record.cost),
        ]);
    }
    table.print();
}

fn describe(record: &FeedingRecord) -> Vec<(&'static str, String)> {
    vec![
        ("id", record.id.clone()),
        ("animal_id", record.animal_id.clone()),
        ("feeding_date", record.feeding_date.to_string()),
        ("feed_type", record.feed_type.clone()),
        ("quantity", opt(&record.quantity)),
        ("quantity_unit", record.quantity_unit.clone()),
        ("cost", opt(&record.cost)),
        ("notes", opt(&record.notes)),
        ("created_at", record.created_at.to_rfc3339()),
        ("updated_at", record.updated_at.to_rfc3339()),
    ]
}
