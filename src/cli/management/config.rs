use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::config::env::EnvParser;
use crate::config::{BackendKind, Config as AppConfig, ConfigBuilder};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// Clear an optional configuration value
    Unset {
        /// Configuration key
        key: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show configuration file path
    Path,

    /// Reset configuration to defaults
    Reset,

    /// List all available configuration keys
    Keys,

    /// Show HERDBOOK_* environment overrides
    Env,
}

const KEYS: &[(&str, &str)] = &[
    ("backend", "rest or sqlite"),
    ("api_url", "Hosted backend base URL"),
    ("api_key", "Project API key"),
    ("access_token", "Signed-in user's access token"),
    ("user_id", "Local identity when there is no access token"),
    ("database_path", "SQLite database file"),
    ("request_timeout_seconds", "Per-request timeout (1-300)"),
    ("max_query_attempts", "Attempts per read (1-10)"),
    ("cache_ttl_seconds", "Cache freshness, 0 = until invalidated (0-86400)"),
    ("cache_max_entries", "Cache size limit (1-100000)"),
    ("persist_cache", "Keep the cache index between runs"),
];

fn mask(secret: &Option<String>) -> String {
    match secret {
        Some(_) => "***".to_string(),
        None => "(unset)".to_string(),
    }
}

fn plain(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "(unset)".to_string())
}

fn get_value(config: &AppConfig, key: &str) -> Result<String> {
    let value = match key {
        "backend" => config.backend.to_string(),
        "api_url" => plain(&config.api_url),
        "api_key" => mask(&config.api_key),
        "access_token" => mask(&config.access_token),
        "user_id" => plain(&config.user_id),
        "database_path" => config.database_path.display().to_string(),
        "request_timeout_seconds" => config.request_timeout_seconds.to_string(),
        "max_query_attempts" => config.max_query_attempts.to_string(),
        "cache_ttl_seconds" => config.cache_ttl_seconds.to_string(),
        "cache_max_entries" => config.cache_max_entries.to_string(),
        "persist_cache" => config.persist_cache.to_string(),
        _ => bail!("Unknown configuration key: {}", key),
    };
    Ok(value)
}

/// Apply one `key = value` change through the validating builder.
fn set_value(config: &AppConfig, key: &str, value: &str) -> Result<AppConfig> {
    let builder = ConfigBuilder::from_config(config.clone());
    let builder = match key {
        "backend" => builder.backend(value.parse::<BackendKind>()?),
        "api_url" => builder.api_url(value)?,
        "api_key" => builder.api_key(value),
        "access_token" => builder.access_token(value),
        "user_id" => builder.user_id(value)?,
        "database_path" => builder.database_path(PathBuf::from(value))?,
        "request_timeout_seconds" => builder.request_timeout_seconds(value.parse()?)?,
        "max_query_attempts" => builder.max_query_attempts(value.parse()?)?,
        "cache_ttl_seconds" => builder.cache_ttl_seconds(value.parse()?)?,
        "cache_max_entries" => builder.cache_max_entries(value.parse()?)?,
        "persist_cache" => builder.persist_cache(value.parse()?),
        _ => bail!("Unknown configuration key: {}", key),
    };
    Ok(builder.build()?)
}

fn unset_value(config: &AppConfig, key: &str) -> Result<AppConfig> {
    let mut config = config.clone();
    match key {
        "api_url" => config.api_url = None,
        "api_key" => config.api_key = None,
        "access_token" => config.access_token = None,
        "user_id" => config.user_id = None,
        _ => bail!("{} is not optional; use 'config set' or 'config reset'", key),
    }
    config.validate()?;
    Ok(config)
}

pub async fn execute(args: ConfigArgs, config: &AppConfig, config_path: Option<&str>) -> Result<()> {
    let config_file = match config_path {
        Some(path) => PathBuf::from(path),
        None => AppConfig::config_path()?,
    };

    match args.command {
        ConfigCommands::Show => {
            println!("🔧 Current configuration:");
            for (key, _) in KEYS {
                println!("  {:<24} {}", format!("{}:", key), get_value(config, key)?);
            }
            println!("  {:<24} {}", "cache_index:", config.cache_index_path().display());
        }

        ConfigCommands::Set { key, value } => {
            let updated = set_value(config, &key, &value)?;
            updated.save(&config_file)?;
            println!("Configuration updated: {} = {}", key, get_value(&updated, &key)?);
        }

        ConfigCommands::Unset { key } => {
            let updated = unset_value(config, &key)?;
            updated.save(&config_file)?;
            println!("Configuration updated: {} unset", key);
        }

        ConfigCommands::Get { key } => {
            println!("{}", get_value(config, &key)?);
        }

        ConfigCommands::Path => {
            println!("{}", config_file.display());
        }

        ConfigCommands::Reset => {
            AppConfig::default().save(&config_file)?;
            println!("✅ Configuration reset to defaults");
            println!("📁 Config file: {}", config_file.display());
        }

        ConfigCommands::Keys => {
            println!("Available configuration keys:");
            for (key, description) in KEYS {
                println!("  {:<24} - {}", key, description);
            }
            println!("\nUsage:");
            println!("  herdbook config get <key>");
            println!("  herdbook config set <key> <value>");
            println!("  herdbook config unset <key>");
        }

        ConfigCommands::Env => {
            let vars = EnvParser::get_all_herdbook_vars();
            if vars.is_empty() {
                println!("No HERDBOOK_* variables set");
            }
            for (key, value) in vars {
                println!("  {}={}", key, value);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            database_path: PathBuf::from("/tmp/herdbook-test/herd.db"),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_set_validates_through_builder() {
        let updated = set_value(&base(), "cache_ttl_seconds", "60").unwrap();
        assert_eq!(updated.cache_ttl_seconds, 60);

        assert!(set_value(&base(), "cache_ttl_seconds", "90000").is_err());
        assert!(set_value(&base(), "request_timeout_seconds", "soon").is_err());
        assert!(set_value(&base(), "colour", "blue").is_err());
        // rest needs api_url and api_key first
        assert!(set_value(&base(), "backend", "rest").is_err());
    }

    #[test]
    fn test_secrets_are_masked() {
        let config = AppConfig {
            api_key: Some("anon-key".to_string()),
            ..base()
        };
        assert_eq!(get_value(&config, "api_key").unwrap(), "***");
        assert_eq!(get_value(&config, "access_token").unwrap(), "(unset)");
    }

    #[test]
    fn test_unset_only_optional_keys() {
        let config = AppConfig {
            user_id: Some("user-1".to_string()),
            ..base()
        };
        assert!(unset_value(&config, "user_id").unwrap().user_id.is_none());
        assert!(unset_value(&config, "database_path").is_err());
    }
}
