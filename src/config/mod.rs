pub mod builder;
pub mod env;
pub mod validation;

pub use builder::ConfigBuilder;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use directories::ProjectDirs;
use tracing::{debug, warn};

use crate::error::ConfigError;
use env::{EnvParser, EnvVars};

/// Which backend the data-access layer talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted PostgREST endpoint
    Rest,
    /// Local SQLite file
    #[default]
    Sqlite,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Rest => "rest",
            BackendKind::Sqlite => "sqlite",
        })
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rest" | "postgrest" => Ok(BackendKind::Rest),
            "sqlite" | "local" => Ok(BackendKind::Sqlite),
            other => Err(ConfigError::InvalidValue {
                field: "backend".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

pub(crate) fn default_request_timeout_seconds() -> u64 {
    30
}

pub(crate) fn default_max_query_attempts() -> u32 {
    3
}

pub(crate) fn default_cache_ttl_seconds() -> u64 {
    300
}

pub(crate) fn default_cache_max_entries() -> usize {
    1000
}

fn default_persist_cache() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend used for every query and mutation
    #[serde(default)]
    pub backend: BackendKind,

    /// Base URL of the hosted backend (rest only)
    #[serde(default)]
    pub api_url: Option<String>,

    /// Project API key sent as `apikey` (rest only)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Signed-in user's access token; its `sub` claim is the identity
    #[serde(default)]
    pub access_token: Option<String>,

    /// Identity for the sqlite backend when there is no access token
    #[serde(default)]
    pub user_id: Option<String>,

    /// SQLite database file
    pub database_path: PathBuf,

    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Attempts per read against the rest backend
    #[serde(default = "default_max_query_attempts")]
    pub max_query_attempts: u32,

    /// Seconds a cached result stays fresh; 0 keeps it until invalidated
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Keep the cache index on disk between runs
    #[serde(default = "default_persist_cache")]
    pub persist_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            api_url: None,
            api_key: None,
            access_token: None,
            user_id: None,
            database_path: Self::default_data_dir().join("herdbook.db"),
            request_timeout_seconds: default_request_timeout_seconds(),
            max_query_attempts: default_max_query_attempts(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            cache_max_entries: default_cache_max_entries(),
            persist_cache: default_persist_cache(),
        }
    }
}

impl Config {
    /// File, then `.env` and `HERDBOOK_*` variables on top. A missing default
    /// config file is written out; a missing explicit one is an error.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_file = match config_path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(ConfigError::FileNotFound { path }.into());
                }
                path
            }
            None => Self::default_config_path()?,
        };

        let file_config = if config_file.exists() {
            debug!("Loading config from {}", config_file.display());
            let content = fs::read_to_string(&config_file)?;
            toml::from_str::<Config>(&content).map_err(ConfigError::InvalidFormat)?
        } else {
            Self::default()
        };

        let config = ConfigBuilder::from_config(file_config).load_from_env()?.build()?;

        if let Some(parent) = config.database_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if !config_file.exists() {
            if let Some(parent) = config_file.parent() {
                fs::create_dir_all(parent)?;
            }
            config.save(&config_file)?;
        }

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn default_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("net", "herdbook", "herdbook")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;

        Ok(project_dirs.config_dir().join("config.toml"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Self::default_config_path()
    }

    pub(crate) fn default_data_dir() -> PathBuf {
        if EnvParser::is_present(EnvVars::DOCKER) {
            return PathBuf::from("/data");
        }
        match ProjectDirs::from("net", "herdbook", "herdbook") {
            Some(project_dirs) => project_dirs.data_dir().to_path_buf(),
            None => {
                warn!("ProjectDirs unavailable; falling back to current directory for data path");
                PathBuf::from(".")
            }
        }
    }

    /// The persisted cache index sits next to the database.
    pub fn cache_index_path(&self) -> PathBuf {
        self.database_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("query-cache.json")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.request_timeout_seconds, 30);
        assert_eq!(config.max_query_attempts, 3);
        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.cache_max_entries, 1000);
        assert!(config.persist_cache);
        assert!(config.database_path.ends_with("herdbook.db"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            backend = "rest"
            api_url = "https://abc.supabase.co"
            database_path = "/tmp/herd.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, BackendKind::Rest);
        assert_eq!(config.api_url.as_deref(), Some("https://abc.supabase.co"));
        assert_eq!(config.cache_max_entries, 1000);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_save_then_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            user_id: Some("user-1".to_string()),
            database_path: dir.path().join("herd.db"),
            cache_ttl_seconds: 0,
            ..Config::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(path.to_str()).unwrap();
        assert_eq!(loaded.user_id.as_deref(), Some("user-1"));
        assert_eq!(loaded.cache_ttl_seconds, 0);
        assert_eq!(loaded.cache_index_path(), dir.path().join("query-cache.json"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Config::load(path.to_str()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("REST".parse::<BackendKind>().unwrap(), BackendKind::Rest);
        assert_eq!("local".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert!("mysql".parse::<BackendKind>().is_err());
    }
}
