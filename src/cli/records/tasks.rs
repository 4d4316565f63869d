use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};

use super::{delete_record, saved, show_record};
use crate::cli::{print_json, require, OutputFormat};
use crate::core::data::models::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};
use crate::core::records::{RecordHook, Tasks};
use crate::services::Services;
use crate::utils::table::{opt, Table};

#[derive(Args)]
pub struct TasksArgs {
    #[command(subcommand)]
    command: TasksCommands,
}

#[derive(Subcommand)]
enum TasksCommands {
    /// Tasks of a farm and/or an animal, soonest due first
    List {
        #[arg(short, long)]
        farm: Option<String>,
        #[arg(short, long)]
        animal: Option<String>,
        /// Hide completed tasks
        #[arg(long)]
        open: bool,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Show one task
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Add a task
    Add {
        #[arg(short, long)]
        farm: String,
        title: String,
        #[arg(short, long)]
        animal: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// High, Medium or Low
        #[arg(short, long, default_value_t = TaskPriority::Medium)]
        priority: TaskPriority,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Change fields of a task
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        animal: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(short, long)]
        priority: Option<TaskPriority>,
        /// Pending, "In Progress" (or in-progress) or Completed
        #[arg(short, long)]
        status: Option<TaskStatus>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Mark a task completed
    Done { id: String },

    /// Delete a task
    Delete { id: String },
}

pub async fn execute(args: TasksArgs, services: &Services) -> Result<()> {
    let cancel = services.cancel_token();
    let client = services.client();

    match args.command {
        TasksCommands::List { farm, animal, open, format } => {
            if farm.is_none() && animal.is_none() {
                bail!("Pass --farm and/or --animal");
            }
            let mut tasks = require(Tasks::new(client, farm.as_deref(), animal.as_deref()).list(&cancel).await)?;
            if open {
                tasks.retain(|task| task.status != TaskStatus::Completed);
            }
            match format {
                OutputFormat::Json => print_json(&tasks)?,
                OutputFormat::Table => print_table(&tasks),
            }
        }

        TasksCommands::Show { id, format } => {
            show_record(&Tasks::new(client, None, None), &id, format, &cancel, describe).await?;
        }

        TasksCommands::Add { farm, title, animal, description, due, priority, format } => {
            let new = NewTask {
                farm_id: farm.clone(),
                title,
                priority,
                status: TaskStatus::Pending,
                animal_id: animal,
                description,
                due_date: due,
            };
            let task = Tasks::new(client, Some(&farm), None).create(&new, &cancel).await?;
            saved("Added task", &task.id, &task, format)?;
        }

        TasksCommands::Update { id, title, animal, description, due, priority, status, format } => {
            let patch = TaskPatch {
                animal_id: animal,
                title,
                description,
                due_date: due,
                priority,
                status,
            };
            let task = Tasks::new(client, None, None).update(&id, &patch, &cancel).await?;
            saved("Updated task", &task.id, &task, format)?;
        }

        TasksCommands::Done { id } => {
            let patch = TaskPatch {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            };
            let task = Tasks::new(client, None, None).update(&id, &patch, &cancel).await?;
            println!("✅ Completed: {}", task.title);
        }

        TasksCommands::Delete { id } => delete_record(&Tasks::new(client, None, None), &id, &cancel).await?,
    }

    Ok(())
}

fn print_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("Nothing to do");
        return;
    }
    let mut table = Table::new(["ID", "Due", "Priority", "Status", "Title", "Animal"]);
    for task in tasks {
        table.row([
            task.id.clone(),
            opt(&task.due_date),
            task.priority.to_string(),
            task.status.to_string(),
            task.title.clone(),
            opt(&task.animal_id),
        ]);
    }
    table.print();
}

fn describe(task: &Task) -> Vec<(&'static str, String)> {
    vec![
        ("id", task.id.clone()),
        ("farm_id", task.farm_id.clone()),
        ("animal_id", opt(&task.animal_id)),
        ("title", task.title.clone()),
        ("description", opt(&task.description)),
        ("due_date", opt(&task.due_date)),
        ("priority", task.priority.to_string()),
        ("status", task.status.to_string()),
        ("created_at", task.created_at.to_rfc3339()),
        ("updated_at", task.updated_at.to_rfc3339()),
    ]
}
