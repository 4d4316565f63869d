use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use super::{delete_record, saved, show_record};
use crate::cli::{print_json, require, OutputFormat};
use crate::core::data::models::{FinancialRecord, FinancialRecordPatch, NewFinancialRecord, TransactionType};
use crate::core::records::{FinancialRecords, RecordHook};
use crate::services::Services;
use crate::utils::table::{opt, Table};

#[derive(Args)]
pub struct FinanceArgs {
    #[command(subcommand)]
    command: FinanceCommands,
}

#[derive(Subcommand)]
enum FinanceCommands {
    /// Transactions of a farm and/or an animal, newest first
    List {
        #[arg(short, long)]
        farm: Option<String>,
        #[arg(short, long)]
        animal: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show one transaction
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Record income or an expense
    Add {
        #[arg(short, long)]
        farm: String,
        /// Income or Expense
        #[arg(short = 't', long = "type")]
        transaction_type: TransactionType,
        /// Feed, veterinary, livestock sales...
        #[arg(short, long)]
        category: String,
        amount: f64,
        /// Animal the transaction is about
        #[arg(short, long)]
        animal: Option<String>,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Change fields of a transaction
    Update {
        id: String,
        #[arg(short = 't', long = "type")]
        transaction_type: Option<TransactionType>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(short, long)]
        animal: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Delete a transaction
    Delete { id: String },
}

pub async fn execute(args: FinanceArgs, services: &Services) -> Result<()> {
    let cancel = services.cancel_token();
    let client = services.client();

    match args.command {
        FinanceCommands::List { farm, animal, format } => {
            if farm.is_none() && animal.is_none() {
                bail!("Pass --farm and/or --animal");
            }
            let records = require(
                FinancialRecords::new(client, farm.as_deref(), animal.as_deref())
                    .list(&cancel)
                    .await,
            )?;
            match format {
                OutputFormat::Json => print_json(&records)?,
                OutputFormat::Table => print_table(&records),
            }
        }

        FinanceCommands::Show { id, format } => {
            show_record(&FinancialRecords::new(client, None, None), &id, format, &cancel, describe).await?;
        }

        FinanceCommands::Add { farm, transaction_type, category, amount, animal, date, description, format } => {
            let new = NewFinancialRecord {
                farm_id: farm.clone(),
                transaction_date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                transaction_type,
                category,
                amount,
                animal_id: animal,
                description,
            };
            let record = FinancialRecords::new(client, Some(&farm), None).create(&new, &cancel).await?;
            saved("Recorded transaction", &record.id, &record, format)?;
        }

        FinanceCommands::Update { id, transaction_type, category, amount, animal, date, description, format } => {
            let patch = FinancialRecordPatch {
                animal_id: animal,
                transaction_date: date,
                transaction_type,
                category,
                amount,
                description,
            };
            let record = FinancialRecords::new(client, None, None).update(&id, &patch, &cancel).await?;
            saved("Updated transaction", &record.id, &record, format)?;
        }

        FinanceCommands::Delete { id } => {
            delete_record(&FinancialRecords::new(client, None, None), &id, &cancel).await?
        }
    }

    Ok(())
}

fn signed(record: &FinancialRecord) -> f64 {
    match record.transaction_type {
        TransactionType::Income => record.amount,
        TransactionType::Expense => -record.amount,
    }
}

fn print_table(records: &[FinancialRecord]) {
    if records.is_empty() {
        println!("No transactions");
        return;
    }
    let mut table = Table::new(["ID", "Date", "Type", "Category", "Amount", "Description"]);
    for record in records {
        table.row([
            record.id.clone(),
            record.transaction_date.to_string(),
            record.transaction_type.to_string(),
            record.category.clone(),
            format!("{:.2}", record.amount),
            opt(&record.description),
        ]);
    }
    table.print();
    let net: f64 = records.iter().map(signed).sum();
    println!("Net: {:.2}", net);
}

fn describe(record: &FinancialRecord) -> Vec<(&'static str, String)> {
    vec![
        ("id", record.id.clone()),
        ("farm_id", record.farm_id.clone()),
        ("animal_id", opt(&record.animal_id)),
        ("transaction_date", record.transaction_date.to_string()),
        ("transaction_type", record.transaction_type.to_string()),
        ("category", record.category.clone()),
        ("amount", format!("{:.2}", record.amount)),
        ("description", opt(&record.description)),
        ("created_at", record.created_at.to_rfc3339()),
        ("updated_at", record.updated_at.to_rfc3339()),
    ]
}
