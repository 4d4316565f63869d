use std::path::Path;
use url::Url;
use crate::error::{Result, HerdbookError};

/// Shared checks for configuration values
pub struct ConfigValidator;

impl ConfigValidator {
    /// The backend base URL must be absolute http(s)
    pub fn validate_url(url: &str, field_name: &str) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| {
            HerdbookError::Validation(format!("Invalid {} URL '{}': {}", field_name, url, e))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(HerdbookError::Validation(format!(
                "{} URL must use http or https, got: {}",
                field_name, url
            )));
        }
        Ok(())
    }

    pub fn validate_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(HerdbookError::Validation(format!(
                "{} must be between {} and {}, got {}",
                field_name, min, max, value
            )));
        }
        Ok(())
    }

    pub fn validate_db_path(path: &Path) -> Result<()> {
        match path.extension() {
            Some(ext) if ext == "db" || ext == "sqlite" || ext == "sqlite3" => Ok(()),
            _ => Err(HerdbookError::Validation(format!(
                "Database file should have a .db, .sqlite, or .sqlite3 extension, got: {}",
                path.display()
            ))),
        }
    }

    /// User ids are opaque but must not be blank
    pub fn validate_user_id(user_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(HerdbookError::Validation("user_id must not be blank".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_url() {
        assert!(ConfigValidator::validate_url("https://abc.supabase.co", "API").is_ok());
        assert!(ConfigValidator::validate_url("http://localhost:54321", "API").is_ok());
        assert!(ConfigValidator::validate_url("not-a-url", "API").is_err());
        assert!(ConfigValidator::validate_url("ftp://example.com", "API").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(ConfigValidator::validate_range(30u64, 1u64, 300u64, "timeout").is_ok());
        assert!(ConfigValidator::validate_range(0u64, 1u64, 300u64, "timeout").is_err());
        assert!(ConfigValidator::validate_range(301u64, 1u64, 300u64, "timeout").is_err());
    }

    #[test]
    fn test_validate_db_path() {
        assert!(ConfigValidator::validate_db_path(&PathBuf::from("herd.db")).is_ok());
        assert!(ConfigValidator::validate_db_path(&PathBuf::from("herd.sqlite3")).is_ok());
        assert!(ConfigValidator::validate_db_path(&PathBuf::from("herd.txt")).is_err());
        assert!(ConfigValidator::validate_db_path(&PathBuf::from("herd")).is_err());
    }
}
