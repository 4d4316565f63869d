use anyhow::Result;
use clap::{Args, Subcommand};

use super::{delete_record, saved, show_record};
use crate::cli::{print_json, require, OutputFormat};
use crate::core::data::models::{AnimalCategory, AnimalCategoryPatch, NewAnimalCategory};
use crate::core::records::{AnimalCategories, RecordHook};
use crate::services::Services;
use crate::utils::table::{opt, Table};

#[derive(Args)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    command: CategoriesCommands,
}

#[derive(Subcommand)]
enum CategoriesCommands {
    /// List animal categories
    List {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show one category
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Add a category, e.g. "Goats"
    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Rename or describe a category
    Update {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Delete a category; its animals become uncategorized
    Delete { id: String },
}

pub async fn execute(args: CategoriesArgs, services: &Services) -> Result<()> {
    let cancel = services.cancel_token();
    let categories = AnimalCategories::new(services.client());

    match args.command {
        CategoriesCommands::List { format } => {
            let list = require(categories.list(&cancel).await)?;
            match format {
                OutputFormat::Json => print_json(&list)?,
                OutputFormat::Table => print_table(&list),
            }
        }

        CategoriesCommands::Show { id, format } => {
            show_record(&categories, &id, format, &cancel, describe).await?;
        }

        CategoriesCommands::Add { name, description, format } => {
            let category = categories.create(&NewAnimalCategory { name, description }, &cancel).await?;
            saved("Added category", &category.id, &category, format)?;
        }

        CategoriesCommands::Update { id, name, description, format } => {
            let patch = AnimalCategoryPatch { name, description };
            let category = categories.update(&id, &patch, &cancel).await?;
            saved("Updated category", &category.id, &category, format)?;
        }

        CategoriesCommands::Delete { id } => delete_record(&categories, &id, &cancel).await?,
    }

    Ok(())
}

fn print_table(categories: &[AnimalCategory]) {
    if categories.is_empty() {
        println!("No categories yet");
        return;
    }
    let mut table = Table::new(["ID", "Name", "Description"]).max_width(40);
    for category in categories {
        table.row([category.id.clone(), category.name.clone(), opt(&category.description)]);
    }
    table.print();
}

fn describe(category: &AnimalCategory) -> Vec<(&'static str, String)> {
    vec![
        ("id", category.id.clone()),
        ("name", category.name.clone()),
        ("description", opt(&category.description)),
        ("created_at", category.created_at.to_rfc3339()),
        ("updated_at", category.updated_at.to_rfc3339()),
    ]
}
