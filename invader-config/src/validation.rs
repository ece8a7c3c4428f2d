//! Startup checks for typed configuration sections

use crate::{ConfigError, Result};

/// Implemented by typed configuration sections
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Checks shared by the configuration sections
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid(field, "cannot be empty"));
        }
        Ok(())
    }

    pub fn in_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::invalid(
                field,
                format!("must be between {} and {}", min, max),
            ));
        }
        Ok(())
    }

    pub fn is_url(value: &str, field: &str) -> Result<()> {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            return Err(ConfigError::invalid(field, "must be an http(s) URL"));
        }
        Ok(())
    }

    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::invalid(field, "must not be port 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("  ", "field").is_err());
    }

    #[test]
    fn test_range_validation() {
        assert!(ConfigValidator::in_range(5, 1, 10, "field").is_ok());
        let err = ConfigValidator::in_range(0, 1, 10, "timeout").unwrap_err();
        assert_eq!(err.to_string(), "timeout must be between 1 and 10");
    }

    #[test]
    fn test_url_validation() {
        assert!(ConfigValidator::is_url("https://api.pagseguro.com", "field").is_ok());
        assert!(ConfigValidator::is_url("api.pagseguro.com", "field").is_err());
    }

    #[test]
    fn test_port_validation() {
        assert!(ConfigValidator::is_port(8069, "field").is_ok());
        assert!(ConfigValidator::is_port(0, "field").is_err());
    }
}
