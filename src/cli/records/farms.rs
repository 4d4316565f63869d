use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use super::{delete_record, saved, show_record};
use crate::cli::{current_user, print_json, require, OutputFormat};
use crate::core::data::models::{Farm, FarmPatch, NewFarm};
use crate::core::records::{Farms, RecordHook};
use crate::services::Services;
use crate::utils::table::{opt, Table};

#[derive(Args)]
pub struct FarmsArgs {
    #[command(subcommand)]
    command: FarmsCommands,
}

#[derive(Subcommand)]
enum FarmsCommands {
    /// List your farms
    List {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show one farm
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Add a farm owned by the current user
    Add {
        name: String,
        #[arg(short, long)]
        location: Option<String>,
        #[arg(short, long)]
        size: Option<f64>,
        /// Unit for --size, e.g. hectares or acres
        #[arg(long)]
        size_unit: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Change fields of a farm
    Update {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        location: Option<String>,
        #[arg(short, long)]
        size: Option<f64>,
        #[arg(long)]
        size_unit: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Delete a farm and everything recorded under it
    Delete { id: String },
}

pub async fn execute(args: FarmsArgs, services: &Services) -> Result<()> {
    let cancel = services.cancel_token();
    let farms = Farms::new(services.client());

    match args.command {
        FarmsCommands::List { format } => {
            let list = require(farms.list(&cancel).await)?;
            match format {
                OutputFormat::Json => print_json(&list)?,
                OutputFormat::Table => print_table(&list),
            }
        }

        FarmsCommands::Show { id, format } => {
            show_record(&farms, &id, format, &cancel, describe).await?;
        }

        FarmsCommands::Add { name, location, size, size_unit, format } => {
            let new = NewFarm {
                user_id: current_user(services.client())?,
                name,
                location,
                size,
                size_unit,
            };
            let farm = farms.create(&new, &cancel).await?;
            info!("Created farm {}", farm.name);
            saved("Added farm", &farm.id, &farm, format)?;
        }

        FarmsCommands::Update { id, name, location, size, size_unit, format } => {
            let patch = FarmPatch { name, location, size, size_unit };
            let farm = farms.update(&id, &patch, &cancel).await?;
            saved("Updated farm", &farm.id, &farm, format)?;
        }

        FarmsCommands::Delete { id } => delete_record(&farms, &id, &cancel).await?,
    }

    Ok(())
}

fn print_table(farms: &[Farm]) {
    if farms.is_empty() {
        println!("No farms yet. Add one with 'herdbook farms add <NAME>'");
        return;
    }
    let mut table = Table::new(["ID", "Name", "Location", "Size"]).max_width(36);
    for farm in farms {
        let size = match (farm.size, &farm.size_unit) {
            (Some(size), Some(unit)) => format!("{} {}", size, unit),
            (Some(size), None) => size.to_string(),
            _ => String::new(),
        };
        table.row([farm.id.clone(), farm.name.clone(), opt(&farm.location), size]);
    }
    table.print();
}

fn describe(farm: &Farm) -> Vec<(&'static str, String)> {
    vec![
        ("id", farm.id.clone()),
        ("name", farm.name.clone()),
        ("location", opt(&farm.location)),
        ("size", opt(&farm.size)),
        ("size_unit", opt(&farm.size_unit)),
        ("created_at", farm.created_at.to_rfc3339()),
        ("updated_at", farm.updated_at.to_rfc3339()),
    ]
}
