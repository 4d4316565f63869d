use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use super::{delete_record, saved, show_record};
use crate::cli::{print_json, require, OutputFormat};
use crate::core::data::models::{Animal, AnimalPatch, AnimalStatus, AnimalWithCategory, Gender, NewAnimal};
use crate::core::records::{Livestock, RecordHook};
use crate::services::Services;
use crate::utils::table::{opt, Table};

#[derive(Args)]
pub struct AnimalsArgs {
    #[command(subcommand)]
    command: AnimalsCommands,
}

/// Optional animal fields shared by `add` and `update`
#[derive(Args)]
struct AnimalFields {
    /// Category id
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    name: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long)]
    born: Option<NaiveDate>,
    #[arg(long)]
    weight: Option<f64>,
    /// Unit for --weight (default kg)
    #[arg(long)]
    weight_unit: Option<String>,
    /// Dam's animal id
    #[arg(long)]
    dam: Option<String>,
    /// Sire's animal id
    #[arg(long)]
    sire: Option<String>,
    /// Acquisition date (YYYY-MM-DD)
    #[arg(long)]
    acquired: Option<NaiveDate>,
    #[arg(long)]
    cost: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum AnimalsCommands {
    /// List animals of a farm, or of all your farms
    List {
        #[arg(short, long)]
        farm: Option<String>,
        /// Only animals with this status
        #[arg(long)]
        status: Option<AnimalStatus>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show one animal
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Add an animal to a farm
    Add {
        #[arg(short, long)]
        farm: String,
        /// Ear tag or other identifier, unique per farm
        #[arg(short, long)]
        tag: String,
        #[arg(short, long)]
        breed: String,
        #[arg(short, long)]
        gender: Gender,
        #[arg(long, default_value_t = AnimalStatus::Active)]
        status: AnimalStatus,
        #[command(flatten)]
        fields: AnimalFields,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Change fields of an animal
    Update {
        id: String,
        #[arg(short, long)]
        tag: Option<String>,
        #[arg(short, long)]
        breed: Option<String>,
        #[arg(short, long)]
        gender: Option<Gender>,
        #[arg(long)]
        status: Option<AnimalStatus>,
        #[command(flatten)]
        fields: AnimalFields,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Delete an animal and its health, breeding and feeding records
    Delete { id: String },
}

pub async fn execute(args: AnimalsArgs, services: &Services) -> Result<()> {
    let cancel = services.cancel_token();
    let client = services.client();

    match args.command {
        AnimalsCommands::List { farm, status, format } => {
            let livestock = Livestock::new(client, farm.as_deref());
            let mut animals = require(livestock.list_with_categories(&cancel).await)?;
            if let Some(status) = status {
                animals.retain(|listed| listed.animal.status == status);
            }
            match format {
                OutputFormat::Json => print_json(&animals)?,
                OutputFormat::Table => print_table(&animals),
            }
        }

        AnimalsCommands::Show { id, format } => {
            show_record(&Livestock::new(client, None), &id, format, &cancel, describe).await?;
        }

        AnimalsCommands::Add { farm, tag, breed, gender, status, fields, format } => {
            let mut new = NewAnimal::new(&farm, tag, breed, gender);
            new.status = status;
            new.category_id = fields.category;
            new.name = fields.name;
            new.date_of_birth = fields.born;
            new.weight = fields.weight;
            new.weight_unit = fields.weight_unit;
            new.parent_female_id = fields.dam;
            new.parent_male_id = fields.sire;
            new.acquisition_date = fields.acquired;
            new.acquisition_cost = fields.cost;
            new.notes = fields.notes;

            let animal = Livestock::new(client, Some(&farm)).create(&new, &cancel).await?;
            saved("Added animal", &animal.id, &animal, format)?;
        }

        AnimalsCommands::Update { id, tag, breed, gender, status, fields, format } => {
            let patch = AnimalPatch {
                category_id: fields.category,
                tag_id: tag,
                name: fields.name,
                breed,
                gender,
                date_of_birth: fields.born,
                weight: fields.weight,
                weight_unit: fields.weight_unit,
                status,
                parent_female_id: fields.dam,
                parent_male_id: fields.sire,
                acquisition_date: fields.acquired,
                acquisition_cost: fields.cost,
                notes: fields.notes,
            };
            let animal = Livestock::new(client, None).update(&id, &patch, &cancel).await?;
            saved("Updated animal", &animal.id, &animal, format)?;
        }

        AnimalsCommands::Delete { id } => delete_record(&Livestock::new(client, None), &id, &cancel).await?,
    }

    Ok(())
}

fn print_table(animals: &[AnimalWithCategory]) {
    if animals.is_empty() {
        println!("No animals found");
        return;
    }
    let mut table = Table::new(["ID", "Tag", "Name", "Category", "Breed", "Gender", "Born", "Weight", "Status"]);
    for AnimalWithCategory { animal, category_name } in animals {
        let weight = animal
            .weight
            .map(|w| format!("{} {}", w, animal.weight_unit))
            .unwrap_or_default();
        table.row([
            animal.id.clone(),
            animal.tag_id.clone(),
            opt(&animal.name),
            opt(category_name),
            animal.breed.clone(),
            animal.gender.to_string(),
            opt(&animal.date_of_birth),
            weight,
            animal.status.to_string(),
        ]);
    }
    table.print();
    println!("{} animal(s)", animals.len());
}

fn describe(animal: &Animal) -> Vec<(&'static str, String)> {
    vec![
        ("id", animal.id.clone()),
        ("farm_id", animal.farm_id.clone()),
        ("tag_id", animal.tag_id.clone()),
        ("name", opt(&animal.name)),
        ("breed", animal.breed.clone()),
        ("gender", animal.gender.to_string()),
        ("status", animal.status.to_string()),
        ("category_id", opt(&animal.category_id)),
        ("date_of_birth", opt(&animal.date_of_birth)),
        ("weight", opt(&animal.weight)),
        ("weight_unit", animal.weight_unit.clone()),
        ("parent_female_id", opt(&animal.parent_female_id)),
        ("parent_male_id", opt(&animal.parent_male_id)),
        ("acquisition_date", opt(&animal.acquisition_date)),
        ("acquisition_cost", opt(&animal.acquisition_cost)),
        ("notes", opt(&animal.notes)),
        ("created_at", animal.created_at.to_rfc3339()),
        ("updated_at", animal.updated_at.to_rfc3339()),
    ]
}
