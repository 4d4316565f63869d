use std::env;
use std::path::PathBuf;
use crate::error::{Result, HerdbookError};

/// Environment variable names read on top of the config file
pub struct EnvVars;

impl EnvVars {
    pub const BACKEND: &'static str = "HERDBOOK_BACKEND";
    pub const API_URL: &'static str = "HERDBOOK_API_URL";
    pub const API_KEY: &'static str = "HERDBOOK_API_KEY";
    pub const ACCESS_TOKEN: &'static str = "HERDBOOK_ACCESS_TOKEN";
    pub const USER_ID: &'static str = "HERDBOOK_USER_ID";
    pub const DATABASE_PATH: &'static str = "HERDBOOK_DATABASE_PATH";
    pub const REQUEST_TIMEOUT_SECONDS: &'static str = "HERDBOOK_REQUEST_TIMEOUT_SECONDS";
    pub const MAX_QUERY_ATTEMPTS: &'static str = "HERDBOOK_MAX_QUERY_ATTEMPTS";
    pub const CACHE_TTL_SECONDS: &'static str = "HERDBOOK_CACHE_TTL_SECONDS";
    pub const CACHE_MAX_ENTRIES: &'static str = "HERDBOOK_CACHE_MAX_ENTRIES";
    pub const PERSIST_CACHE: &'static str = "HERDBOOK_PERSIST_CACHE";

    pub const DOCKER: &'static str = "DOCKER";
}

/// Environment variable parsing with validation
pub struct EnvParser;

impl EnvParser {
    /// Trimmed string value; empty counts as unset
    pub fn parse_string(var_name: &str, validator: Option<fn(&str) -> Result<()>>) -> Result<Option<String>> {
        match env::var(var_name) {
            Ok(value) => {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    return Ok(None);
                }

                if let Some(validate_fn) = validator {
                    validate_fn(&trimmed)?;
                }

                Ok(Some(trimmed))
            }
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(HerdbookError::Validation(format!(
                "Environment variable {} contains invalid UTF-8",
                var_name
            ))),
        }
    }

    pub fn parse_path(var_name: &str) -> Result<Option<PathBuf>> {
        Ok(Self::parse_string(var_name, None)?.map(PathBuf::from))
    }

    pub fn parse_bool(var_name: &str) -> Result<Option<bool>> {
        if let Some(value_str) = Self::parse_string(var_name, None)? {
            match value_str.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(HerdbookError::Validation(format!(
                    "Invalid boolean value in {}: '{}'. Use: true/false, 1/0, yes/no, on/off",
                    var_name, value_str
                ))),
            }
        } else {
            Ok(None)
        }
    }

    /// Parse as u64 within `min..=max`
    pub fn parse_u64(var_name: &str, min: u64, max: u64) -> Result<Option<u64>> {
        let Some(value_str) = Self::parse_string(var_name, None)? else {
            return Ok(None);
        };
        let value = value_str.parse::<u64>().map_err(|_| {
            HerdbookError::Validation(format!(
                "Invalid number in {}: '{}'. Must be a non-negative integer",
                var_name, value_str
            ))
        })?;

        if value < min || value > max {
            return Err(HerdbookError::Validation(format!(
                "Value in {} must be between {} and {}, got {}",
                var_name, min, max, value
            )));
        }

        Ok(Some(value))
    }

    pub fn parse_usize(var_name: &str, min: usize, max: usize) -> Result<Option<usize>> {
        Ok(Self::parse_u64(var_name, min as u64, max as u64)?.map(|v| v as usize))
    }

    pub fn is_present(var_name: &str) -> bool {
        env::var(var_name).is_ok()
    }

    /// All HERDBOOK_* variables, secrets masked, for `config show`
    pub fn get_all_herdbook_vars() -> Vec<(String, String)> {
        env::vars()
            .filter(|(key, _)| key.starts_with("HERDBOOK_"))
            .map(|(key, value)| {
                if key == EnvVars::API_KEY || key == EnvVars::ACCESS_TOKEN {
                    (key, "***".to_string())
                } else {
                    (key, value)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_parse_bool() {
        env::set_var("HB_TEST_BOOL_TRUE", "yes");
        env::set_var("HB_TEST_BOOL_FALSE", "0");
        env::set_var("HB_TEST_BOOL_INVALID", "maybe");

        assert_eq!(EnvParser::parse_bool("HB_TEST_BOOL_TRUE").unwrap(), Some(true));
        assert_eq!(EnvParser::parse_bool("HB_TEST_BOOL_FALSE").unwrap(), Some(false));
        assert!(EnvParser::parse_bool("HB_TEST_BOOL_INVALID").is_err());
        assert_eq!(EnvParser::parse_bool("HB_TEST_BOOL_NOT_SET").unwrap(), None);

        env::remove_var("HB_TEST_BOOL_TRUE");
        env::remove_var("HB_TEST_BOOL_FALSE");
        env::remove_var("HB_TEST_BOOL_INVALID");
    }

    #[test]
    fn test_parse_u64_range() {
        env::set_var("HB_TEST_U64_VALID", "42");
        env::set_var("HB_TEST_U64_ZERO", "0");
        env::set_var("HB_TEST_U64_OUT_OF_RANGE", "301");
        env::set_var("HB_TEST_U64_INVALID", "thirty");

        assert_eq!(EnvParser::parse_u64("HB_TEST_U64_VALID", 1, 300).unwrap(), Some(42));
        assert_eq!(EnvParser::parse_u64("HB_TEST_U64_ZERO", 0, 300).unwrap(), Some(0));
        assert!(EnvParser::parse_u64("HB_TEST_U64_OUT_OF_RANGE", 1, 300).is_err());
        assert!(EnvParser::parse_u64("HB_TEST_U64_INVALID", 1, 300).is_err());
        assert_eq!(EnvParser::parse_u64("HB_TEST_U64_NOT_SET", 1, 300).unwrap(), None);

        env::remove_var("HB_TEST_U64_VALID");
        env::remove_var("HB_TEST_U64_ZERO");
        env::remove_var("HB_TEST_U64_OUT_OF_RANGE");
        env::remove_var("HB_TEST_U64_INVALID");
    }

    #[test]
    fn test_blank_string_is_unset() {
        env::set_var("HB_TEST_BLANK", "   ");
        assert_eq!(EnvParser::parse_string("HB_TEST_BLANK", None).unwrap(), None);
        env::remove_var("HB_TEST_BLANK");
    }
}
