use std::path::{Path, PathBuf};
use crate::config::env::{EnvParser, EnvVars};
use crate::config::validation::ConfigValidator;
use crate::config::{BackendKind, Config};
use crate::error::{ConfigError, Result};

/// Configuration builder with validation and type safety
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    backend: Option<BackendKind>,
    api_url: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    user_id: Option<String>,
    database_path: Option<PathBuf>,
    request_timeout_seconds: Option<u64>,
    max_query_attempts: Option<u32>,
    cache_ttl_seconds: Option<u64>,
    cache_max_entries: Option<usize>,
    persist_cache: Option<bool>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one read from the file
    pub fn from_config(config: Config) -> Self {
        Self {
            backend: Some(config.backend),
            api_url: config.api_url,
            api_key: config.api_key,
            access_token: config.access_token,
            user_id: config.user_id,
            database_path: Some(config.database_path),
            request_timeout_seconds: Some(config.request_timeout_seconds),
            max_query_attempts: Some(config.max_query_attempts),
            cache_ttl_seconds: Some(config.cache_ttl_seconds),
            cache_max_entries: Some(config.cache_max_entries),
            persist_cache: Some(config.persist_cache),
        }
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the hosted backend URL with validation
    pub fn api_url<S: Into<String>>(mut self, url: S) -> Result<Self> {
        let url = url.into();
        ConfigValidator::validate_url(&url, "API")?;
        self.api_url = Some(url.trim_end_matches('/').to_string());
        Ok(self)
    }

    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn access_token<S: Into<String>>(mut self, token: S) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn user_id<S: Into<String>>(mut self, user_id: S) -> Result<Self> {
        let user_id = user_id.into();
        ConfigValidator::validate_user_id(&user_id)?;
        self.user_id = Some(user_id);
        Ok(self)
    }

    /// Set database path with validation
    pub fn database_path<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ConfigValidator::validate_db_path(&path)?;
        self.database_path = Some(path);
        Ok(self)
    }

    pub fn request_timeout_seconds(mut self, seconds: u64) -> Result<Self> {
        ConfigValidator::validate_range(seconds, 1, 300, "request timeout seconds")?;
        self.request_timeout_seconds = Some(seconds);
        Ok(self)
    }

    pub fn max_query_attempts(mut self, attempts: u32) -> Result<Self> {
        ConfigValidator::validate_range(attempts, 1, 10, "max query attempts")?;
        self.max_query_attempts = Some(attempts);
        Ok(self)
    }

    pub fn cache_ttl_seconds(mut self, seconds: u64) -> Result<Self> {
        ConfigValidator::validate_range(seconds, 0, 86_400, "cache TTL seconds")?;
        self.cache_ttl_seconds = Some(seconds);
        Ok(self)
    }

    pub fn cache_max_entries(mut self, entries: usize) -> Result<Self> {
        ConfigValidator::validate_range(entries, 1, 100_000, "cache max entries")?;
        self.cache_max_entries = Some(entries);
        Ok(self)
    }

    pub fn persist_cache(mut self, persist: bool) -> Self {
        self.persist_cache = Some(persist);
        self
    }

    /// Apply `HERDBOOK_*` environment variables with validation
    pub fn load_from_env(mut self) -> Result<Self> {
        if let Some(backend) = EnvParser::parse_string(EnvVars::BACKEND, None)? {
            self = self.backend(backend.parse::<BackendKind>()?);
        }

        if let Some(url) = EnvParser::parse_string(EnvVars::API_URL, None)? {
            self = self.api_url(url)?;
        }

        if let Some(key) = EnvParser::parse_string(EnvVars::API_KEY, None)? {
            self = self.api_key(key);
        }

        if let Some(token) = EnvParser::parse_string(EnvVars::ACCESS_TOKEN, None)? {
            self = self.access_token(token);
        }

        if let Some(user_id) = EnvParser::parse_string(EnvVars::USER_ID, None)? {
            self = self.user_id(user_id)?;
        }

        if let Some(path) = EnvParser::parse_path(EnvVars::DATABASE_PATH)? {
            self = self.database_path(path)?;
        }

        // Numeric values with validation
        if let Some(timeout) = EnvParser::parse_u64(EnvVars::REQUEST_TIMEOUT_SECONDS, 1, 300)? {
            self = self.request_timeout_seconds(timeout)?;
        }

        if let Some(attempts) = EnvParser::parse_u64(EnvVars::MAX_QUERY_ATTEMPTS, 1, 10)? {
            self = self.max_query_attempts(attempts as u32)?;
        }

        if let Some(ttl) = EnvParser::parse_u64(EnvVars::CACHE_TTL_SECONDS, 0, 86_400)? {
            self = self.cache_ttl_seconds(ttl)?;
        }

        if let Some(entries) = EnvParser::parse_usize(EnvVars::CACHE_MAX_ENTRIES, 1, 100_000)? {
            self = self.cache_max_entries(entries)?;
        }

        if let Some(persist) = EnvParser::parse_bool(EnvVars::PERSIST_CACHE)? {
            self = self.persist_cache(persist);
        }

        Ok(self)
    }

    /// Build the configuration with defaults
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();

        let config = Config {
            backend: self.backend.unwrap_or(defaults.backend),
            api_url: self.api_url,
            api_key: self.api_key,
            access_token: self.access_token,
            user_id: self.user_id,
            database_path: self.database_path.unwrap_or(defaults.database_path),
            request_timeout_seconds: self.request_timeout_seconds.unwrap_or(defaults.request_timeout_seconds),
            max_query_attempts: self.max_query_attempts.unwrap_or(defaults.max_query_attempts),
            cache_ttl_seconds: self.cache_ttl_seconds.unwrap_or(defaults.cache_ttl_seconds),
            cache_max_entries: self.cache_max_entries.unwrap_or(defaults.cache_max_entries),
            persist_cache: self.persist_cache.unwrap_or(defaults.persist_cache),
        };

        config.validate()?;

        Ok(config)
    }
}

impl Config {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_db_path(&self.database_path)?;

        if self.backend == BackendKind::Rest {
            let url = self.api_url.as_deref().ok_or_else(|| ConfigError::MissingField {
                field: "api_url".to_string(),
            })?;
            ConfigValidator::validate_url(url, "API")?;
            if self.api_key.is_none() {
                return Err(ConfigError::MissingField {
                    field: "api_key".to_string(),
                }
                .into());
            }
        }

        if let Some(ref user_id) = self.user_id {
            ConfigValidator::validate_user_id(user_id)?;
        }

        ConfigValidator::validate_range(self.request_timeout_seconds, 1, 300, "request timeout seconds")?;
        ConfigValidator::validate_range(self.max_query_attempts, 1, 10, "max query attempts")?;
        ConfigValidator::validate_range(self.cache_ttl_seconds, 0, 86_400, "cache TTL seconds")?;
        ConfigValidator::validate_range(self.cache_max_entries, 1, 100_000, "cache max entries")?;

        Ok(())
    }
}
