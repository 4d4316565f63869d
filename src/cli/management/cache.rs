use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use crate::core::query::key::{Collection, Invalidation};
use crate::services::Services;

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommands,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache statistics
    Stats,

    /// Clear all cached query results
    Clear,

    /// Drop expired entries
    Cleanup,

    /// Drop cached results of one collection, e.g. animals
    Invalidate { collection: Collection },

    /// Show cache configuration
    Info,
}

pub async fn execute(args: CacheArgs, services: &Services) -> Result<()> {
    let client = services.client();
    let config = services.config();

    match args.command {
        CacheCommands::Stats => {
            let stats = client.cache_stats();

            println!("📊 Cache Statistics");
            println!("══════════════════");
            println!("🗂️  Total Entries: {}", stats.total_entries);
            println!("📈 Total Requests: {}", stats.total_requests);
            println!("✅ Cache Hits: {}", stats.cache_hits);
            println!("📊 Hit Rate: {:.1}%", stats.hit_rate_percent);

            if stats.last_cleanup > 0 {
                let now = chrono::Utc::now().timestamp().max(0) as u64;
                println!("🧹 Last Cleanup: {} seconds ago", now.saturating_sub(stats.last_cleanup));
            }
        }

        CacheCommands::Clear => {
            info!("Clearing query cache");
            let before = client.cache_stats().total_entries;
            client.clear_cache();
            println!("✅ Cache cleared ({} entries removed)", before);
        }

        CacheCommands::Cleanup => {
            let before = client.cache_stats().total_entries;
            client.cleanup_cache();
            let after = client.cache_stats().total_entries;

            println!("✅ Cache cleanup completed!");
            println!("🗑️ Removed {} entries", before.saturating_sub(after));
            println!("📊 Cache now contains {} entries", after);
        }

        CacheCommands::Invalidate { collection } => {
            let dropped = client.invalidate(&Invalidation::Collection(collection));
            println!("✅ Dropped {} cached {} queries", dropped, collection);
        }

        CacheCommands::Info => {
            let index_path = config.cache_index_path();

            println!("ℹ️  Cache Configuration");
            println!("═════════════════════");
            if config.persist_cache {
                println!("📁 Index File: {}", index_path.display());
            } else {
                println!("📁 Index File: none (persist_cache = false)");
            }
            if config.cache_ttl_seconds == 0 {
                println!("⏰ Max Age: until invalidated");
            } else {
                println!("⏰ Max Age: {} seconds", config.cache_ttl_seconds);
            }
            println!("📊 Max Entries: {}", config.cache_max_entries);

            if config.persist_cache && index_path.exists() {
                let metadata = std::fs::metadata(&index_path)?;
                println!("💾 Index Size: ~{} KB", metadata.len() / 1024);
            }
        }
    }

    Ok(())
}
