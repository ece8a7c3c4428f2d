//! `pagseguro` configuration section

use invader_config::{ConfigValidator, Validate};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct PagseguroConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Account token, sent as bearer credentials
    #[serde(deserialize_with = "secret")]
    pub token: SecretString,
    /// Webhook URL registered on every charge and order
    #[serde(default)]
    pub notification_url: Option<String>,
    /// Name printed on the card statement
    #[serde(default)]
    pub soft_descriptor: Option<String>,
    #[serde(default = "default_boleto_due_days")]
    pub boleto_due_days: u32,
    #[serde(default = "default_pix_expiration_secs")]
    pub pix_expiration_secs: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn default_base_url() -> String {
    "https://sandbox.api.pagseguro.com".to_string()
}

fn default_boleto_due_days() -> u32 {
    3
}

fn default_pix_expiration_secs() -> u32 {
    3600
}

fn default_timeout_secs() -> u64 {
    30
}

impl PagseguroConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            token: SecretString::from(token.into()),
            notification_url: None,
            soft_descriptor: None,
            boleto_due_days: default_boleto_due_days(),
            pix_expiration_secs: default_pix_expiration_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_notification_url(mut self, url: impl Into<String>) -> Self {
        self.notification_url = Some(url.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Validate for PagseguroConfig {
    fn validate(&self) -> invader_config::Result<()> {
        ConfigValidator::is_url(&self.base_url, "pagseguro.base_url")?;
        ConfigValidator::not_empty(self.token.expose_secret(), "pagseguro.token")?;
        if let Some(url) = &self.notification_url {
            ConfigValidator::is_url(url, "pagseguro.notification_url")?;
        }
        if let Some(descriptor) = &self.soft_descriptor {
            // PagSeguro truncates silently past 17 characters
            ConfigValidator::in_range(descriptor.chars().count(), 1, 17, "pagseguro.soft_descriptor")?;
        }
        ConfigValidator::in_range(self.boleto_due_days, 1, 60, "pagseguro.boleto_due_days")?;
        ConfigValidator::in_range(self.pix_expiration_secs, 60, 86_400, "pagseguro.pix_expiration_secs")?;
        ConfigValidator::in_range(self.timeout_secs, 1, 300, "pagseguro.timeout_secs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_defaults() {
        let config: PagseguroConfig =
            serde_json::from_value(serde_json::json!({"token": "abc"})).unwrap();
        assert_eq!(config.base_url, "https://sandbox.api.pagseguro.com");
        assert_eq!(config.boleto_due_days, 3);
        assert!(config.notification_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(PagseguroConfig::new("").validate().is_err());
        assert!(
            PagseguroConfig::new("abc")
                .with_notification_url("not a url")
                .validate()
                .is_err()
        );

        let mut config = PagseguroConfig::new("abc");
        config.soft_descriptor = Some("A descriptor way too long".into());
        assert!(config.validate().is_err());
    }
}
