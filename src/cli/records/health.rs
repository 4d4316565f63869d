use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use super::{delete_record, saved, show_record};
use crate::cli::{print_json, require, OutputFormat};
use crate::core::data::models::{HealthRecord, HealthRecordPatch, HealthRecordType, NewHealthRecord};
use crate::core::records::{HealthRecords, RecordHook};
use crate::services::Services;
use crate::utils::table::{opt, Table};

#[derive(Args)]
pub struct HealthArgs {
    #[command(subcommand)]
    command: HealthCommands,
}

#[derive(Args)]
struct HealthFields {
    #[arg(long)]
    medicine: Option<String>,
    #[arg(long)]
    dosage: Option<String>,
    /// Vet or handler who gave the treatment
    #[arg(long)]
    by: Option<String>,
    #[arg(long)]
    cost: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum HealthCommands {
    /// Health history of an animal, newest first
    List {
        animal: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show one health record
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Record a vaccination, treatment, checkup or disease
    Add {
        animal: String,
        /// Vaccination, Treatment, Checkup, Disease or Other
        #[arg(short = 't', long = "type")]
        record_type: HealthRecordType,
        #[arg(short, long)]
        description: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        fields: HealthFields,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Change fields of a health record
    Update {
        id: String,
        #[arg(short = 't', long = "type")]
        record_type: Option<HealthRecordType>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        fields: HealthFields,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Delete a health record
    Delete { id: String },
}

pub async fn execute(args: HealthArgs, services: &Services) -> Result<()> {
    let cancel = services.cancel_token();
    let client = services.client();

    match args.command {
        HealthCommands::List { animal, format } => {
            let records = require(HealthRecords::new(client, Some(&animal)).list(&cancel).await)?;
            match format {
                OutputFormat::Json => print_json(&records)?,
                OutputFormat::Table => print_table(&records),
            }
        }

        HealthCommands::Show { id, format } => {
            show_record(&HealthRecords::new(client, None), &id, format, &cancel, describe).await?;
        }

        HealthCommands::Add { animal, record_type, description, date, fields, format } => {
            let new = NewHealthRecord {
                animal_id: animal.clone(),
                record_date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                record_type,
                description,
                medicine: fields.medicine,
                dosage: fields.dosage,
                administered_by: fields.by,
                cost: fields.cost,
                notes: fields.notes,
            };
            let record = HealthRecords::new(client, Some(&animal)).create(&new, &cancel).await?;
            saved("Added health record", &record.id, &record, format)?;
        }

        HealthCommands::Update { id, record_type, description, date, fields, format } => {
            let patch = HealthRecordPatch {
                record_date: date,
                record_type,
                description,
                medicine: fields.medicine,
                dosage: fields.dosage,
                administered_by: fields.by,
                cost: fields.cost,
                notes: fields.notes,
            };
            let record = HealthRecords::new(client, None).update(&id, &patch, &cancel).await?;
            saved("Updated health record", &record.id, &record, format)?;
        }

        HealthCommands::Delete { id } => delete_record(&HealthRecords::new(client, None), &id, &cancel).await?,
    }

    Ok(())
}

fn print_table(records: &[HealthRecord]) {
    if records.is_empty() {
        println!("No health records");
        return;
    }
    let mut table = Table::new(["ID", "Date", "Type", "Description", "Medicine", "Cost"]);
    for record in records {
        table.row([
            record.id.clone(),
            record.record_date.to_string(),
            record.record_type.to_string(),
            record.description.clone(),
            opt(&record.medicine),
            opt(&record.cost),
        ]);
    }
    table.print();
}

fn describe(record: &HealthRecord) -> Vec<(&'static str, String)> {
    vec![
        ("id", record.id.clone()),
        ("animal_id", record.animal_id.clone()),
        ("record_date", record.record_date.to_string()),
        ("record_type", record.record_type.to_string()),
        ("description", record.description.clone()),
        ("medicine", opt(&record.medicine)),
        ("dosage", opt(&record.dosage)),
        ("administered_by", opt(&record.administered_by)),
        ("cost", opt(&record.cost)),
        ("notes", opt(&record.notes)),
        ("created_at", record.created_at.to_rfc3339()),
        ("updated_at", record.updated_at.to_rfc3339()),
    ]
}
