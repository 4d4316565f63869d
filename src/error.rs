//! Error handling for herdbook
//!
//! Errors are grouped by the layer that raises them. Backend errors travel to
//! the caller unchanged; nothing in the data-access layer retries or recovers
//! beyond the REST backend's transport retries for reads.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HerdbookError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No matching row in {collection}")]
    NotFound { collection: String },

    #[error("Refusing to {operation} {collection} without a match predicate")]
    UnboundedMutation { collection: String, operation: &'static str },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// An error reported by the hosted backend itself.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{message} (status {status}{})", code_suffix(.code))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("Response invalid: {reason}")]
    InvalidResponse { reason: String },
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout exceeded")]
    Timeout,

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid identifier: {0}")]
    Identifier(String),

    #[error("Unknown procedure: {0}")]
    UnknownProcedure(String),

    #[error("Database lock poisoned")]
    Poisoned,

    #[error("Database corruption detected")]
    Corruption,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid config format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache index I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HerdbookError>;

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(", code {}", c)).unwrap_or_default()
}

impl HerdbookError {
    /// True for errors that mean "no row matched" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HerdbookError::NotFound { .. })
    }
}

use rusqlite::ffi;

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ffi::Error { code: ffi::ErrorCode::DatabaseCorrupt, .. }, _) => {
                DatabaseError::Corruption
            }
            rusqlite::Error::SqliteFailure(ffi::Error { code: ffi::ErrorCode::ConstraintViolation, .. }, msg) => {
                DatabaseError::Constraint(msg.unwrap_or_else(|| "constraint failed".to_string()))
            }
            _ => DatabaseError::Query(err),
        }
    }
}

impl From<rusqlite::Error> for HerdbookError {
    fn from(err: rusqlite::Error) -> Self {
        HerdbookError::Database(err.into())
    }
}

impl From<reqwest::Error> for HerdbookError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HerdbookError::Network(NetworkError::Timeout)
        } else {
            HerdbookError::Network(NetworkError::Http(err))
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err)
    }
}

impl From<serde_json::Error> for HerdbookError {
    fn from(err: serde_json::Error) -> Self {
        HerdbookError::Backend(BackendError::InvalidResponse { reason: err.to_string() })
    }
}

impl From<toml::de::Error> for HerdbookError {
    fn from(err: toml::de::Error) -> Self {
        HerdbookError::Config(ConfigError::InvalidFormat(err))
    }
}

impl From<std::io::Error> for HerdbookError {
    fn from(err: std::io::Error) -> Self {
        HerdbookError::Cache(CacheError::Io(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_includes_code() {
        let err = BackendError::Api {
            status: 409,
            code: Some("23505".to_string()),
            message: "duplicate key value".to_string(),
            details: None,
            hint: None,
        };
        assert_eq!(err.to_string(), "duplicate key value (status 409, code 23505)");
    }

    #[test]
    fn test_not_found_detection() {
        let err = HerdbookError::NotFound { collection: "animals".to_string() };
        assert!(err.is_not_found());
        assert!(!HerdbookError::Cancelled.is_not_found());
    }
}
