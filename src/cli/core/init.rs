use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use crate::cli::require;
use crate::config::{BackendKind, Config};
use crate::core::data::models::NewAnimalCategory;
use crate::core::records::{AnimalCategories, RecordHook};
use crate::services::Services;

/// Categories offered when none exist yet
const DEFAULT_CATEGORIES: &[&str] = &["Cattle", "Sheep", "Goats", "Pigs", "Poultry"];

#[derive(Args)]
pub struct InitArgs {
    /// Add the common animal categories if they are missing
    #[arg(long)]
    seed_categories: bool,
}

pub async fn execute(args: InitArgs, services: &Services) -> Result<()> {
    let config = services.config();
    let client = services.client();
    let cancel = services.cancel_token();

    println!("🐄 herdbook ready");
    println!("🔌 Backend: {}", config.backend);
    match config.backend {
        BackendKind::Sqlite => println!("🗄️  Database: {}", config.database_path.display()),
        BackendKind::Rest => println!("🌐 API: {}", config.api_url.as_deref().unwrap_or("")),
    }
    println!("📁 Config: {}", Config::config_path()?.display());

    match client.user_id() {
        Some(user_id) => println!("👤 Identity: {}", user_id),
        None => {
            warn!("No identity configured; queries will not run");
            println!("👤 Identity: none (set user_id or access_token)");
        }
    }

    if let Some(sqlite) = services.sqlite() {
        println!("🧬 Schema version: {}", sqlite.schema_version()?);
        for (collection, count) in sqlite.table_counts()? {
            println!("   {:<20} {}", collection.table_name(), count);
        }
    }

    if args.seed_categories {
        let categories = AnimalCategories::new(client);
        let existing = require(categories.list(&cancel).await)?;
        let mut added = 0;
        for name in DEFAULT_CATEGORIES {
            if existing.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
                continue;
            }
            let new = NewAnimalCategory {
                name: name.to_string(),
                description: None,
            };
            categories.create(&new, &cancel).await?;
            added += 1;
        }
        info!("Seeded {} categories", added);
        println!("🏷️  Added {} animal categories", added);
    } else if client.is_authenticated() {
        // Connectivity check
        let categories = require(AnimalCategories::new(client).list(&cancel).await)?;
        println!("🏷️  {} animal categories", categories.len());
    }

    println!("\n📋 Next steps:");
    println!("  1. herdbook farms add <NAME>");
    println!("  2. herdbook animals add --farm <FARM_ID> --tag <TAG> --breed <BREED> --gender female");
    println!("  3. herdbook report --farm <FARM_ID>");

    Ok(())
}
