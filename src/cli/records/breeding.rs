use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use super::{delete_record, saved, show_record};
use crate::cli::{print_json, require, OutputFormat};
use crate::core::data::models::{BreedingRecord, BreedingRecordPatch, NewBreedingRecord};
use crate::core::records::{BreedingRecords, RecordHook};
use crate::services::Services;
use crate::utils::table::{opt, Table};

#[derive(Args)]
pub struct BreedingArgs {
    #[command(subcommand)]
    command: BreedingCommands,
}

#[derive(Args)]
struct BreedingFields {
    /// Expected delivery date (YYYY-MM-DD)
    #[arg(long)]
    expected: Option<NaiveDate>,
    /// Actual delivery date (YYYY-MM-DD)
    #[arg(long)]
    delivered: Option<NaiveDate>,
    /// Whether the breeding took
    #[arg(long)]
    success: Option<bool>,
    #[arg(long)]
    offspring: Option<i64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum BreedingCommands {
    /// Breedings an animal took part in, as dam or sire
    List {
        animal: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show one breeding record
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Record a breeding
    Add {
        /// Dam's animal id
        dam: String,
        /// Sire's animal id, if known
        #[arg(long)]
        sire: Option<String>,
        /// Natural, AI, ...
        #[arg(short = 't', long = "type", default_value = "Natural")]
        breeding_type: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        fields: BreedingFields,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Change fields of a breeding record, e.g. record the delivery
    Update {
        id: String,
        #[arg(long)]
        sire: Option<String>,
        #[arg(short = 't', long = "type")]
        breeding_type: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        fields: BreedingFields,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Delete a breeding record
    Delete { id: String },
}

pub async fn execute(args: BreedingArgs, services: &Services) -> Result<()> {
    let cancel = services.cancel_token();
    let client = services.client();

    match args.command {
        BreedingCommands::List { animal, format } => {
            let records = require(BreedingRecords::new(client, Some(&animal)).list(&cancel).await)?;
            match format {
                OutputFormat::Json => print_json(&records)?,
                OutputFormat::Table => print_table(&records),
            }
        }

        BreedingCommands::Show { id, format } => {
            show_record(&BreedingRecords::new(client, None), &id, format, &cancel, describe).await?;
        }

        BreedingCommands::Add { dam, sire, breeding_type, date, fields, format } => {
            let new = NewBreedingRecord {
                female_id: dam.clone(),
                breeding_date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                breeding_type,
                male_id: sire,
                expected_delivery_date: fields.expected,
                actual_delivery_date: fields.delivered,
                success: fields.success,
                offspring_count: fields.offspring,
                notes: fields.notes,
            };
            let record = BreedingRecords::new(client, Some(&dam)).create(&new, &cancel).await?;
            saved("Added breeding record", &record.id, &record, format)?;
        }

        BreedingCommands::Update { id, sire, breeding_type, date, fields, format } => {
            let patch = BreedingRecordPatch {
                male_id: sire,
                breeding_date: date,
                breeding_type,
                expected_delivery_date: fields.expected,
                actual_delivery_date: fields.delivered,
                success: fields.success,
                offspring_count: fields.offspring,
                notes: fields.notes,
            };
            let record = BreedingRecords::new(client, None).update(&id, &patch, &cancel).await?;
            saved("Updated breeding record", &record.id, &record, format)?;
        }

        BreedingCommands::Delete { id } => delete_record(&BreedingRecords::new(client, None), &id, &cancel).await?,
    }

    Ok(())
}

fn outcome(success: Option<bool>) -> String {
    match success {
        Some(true) => "Success".to_string(),
        Some(false) => "Failed".to_string(),
        None => "Pending".to_string(),
    }
}

fn print_table(records: &[BreedingRecord]) {
    if records.is_empty() {
        println!("No breeding records");
        return;
    }
    let mut table = Table::new(["ID", "Date", "Dam", "Sire", "Type", "Due", "Outcome", "Offspring"]);
    for record in records {
        table.row([
            record.id.clone(),
            record.breeding_date.to_string(),
            record.female_id.clone(),
            opt(&record.male_id),
            record.breeding_type.clone(),
            opt(&record.expected_delivery_date),
            outcome(record.success),
            opt(&record.offspring_count),
        ]);
    }
    table.print();
}

fn describe(record: &BreedingRecord) -> Vec<(&'static str, String)> {
    vec![
        ("id", record.id.clone()),
        ("female_id", record.female_id.clone()),
        ("male_id", opt(&record.male_id)),
        ("breeding_date", record.breeding_date.to_string()),
        ("breeding_type", record.breeding_type.clone()),
        ("expected_delivery", opt(&record.expected_delivery_date)),
        ("actual_delivery", opt(&record.actual_delivery_date)),
        ("outcome", outcome(record.success)),
        ("offspring_count", opt(&record.offspring_count)),
        ("notes", opt(&record.notes)),
        ("created_at", record.created_at.to_rfc3339()),
        ("updated_at", record.updated_at.to_rfc3339()),
    ]
}
