//! `bb` configuration section

use invader_config::{ConfigValidator, Validate};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Banco do Brasil API credentials and endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct BbConfig {
    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(deserialize_with = "secret")]
    pub client_id: SecretString,
    #[serde(deserialize_with = "secret")]
    pub client_secret: SecretString,
    /// `gw-dev-app-key` sent with every API call
    #[serde(deserialize_with = "secret")]
    pub developer_application_key: SecretString,
    /// PIX key receiving the collections
    pub pix_key: String,
    /// Collection lifetime
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn default_oauth_url() -> String {
    "https://oauth.hm.bb.com.br/oauth/token".to_string()
}

fn default_base_url() -> String {
    "https://api.hm.bb.com.br/pix/v2".to_string()
}

fn default_expiration_secs() -> u32 {
    3600
}

fn default_timeout_secs() -> u64 {
    30
}

impl BbConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        developer_application_key: impl Into<String>,
        pix_key: impl Into<String>,
    ) -> Self {
        Self {
            oauth_url: default_oauth_url(),
            base_url: default_base_url(),
            client_id: SecretString::from(client_id.into()),
            client_secret: SecretString::from(client_secret.into()),
            developer_application_key: SecretString::from(developer_application_key.into()),
            pix_key: pix_key.into(),
            expiration_secs: default_expiration_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Point both endpoints at another host (tests, production)
    pub fn with_urls(mut self, oauth_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.oauth_url = oauth_url.into();
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Validate for BbConfig {
    fn validate(&self) -> invader_config::Result<()> {
        ConfigValidator::is_url(&self.oauth_url, "bb.oauth_url")?;
        ConfigValidator::is_url(&self.base_url, "bb.base_url")?;
        ConfigValidator::not_empty(self.client_id.expose_secret(), "bb.client_id")?;
        ConfigValidator::not_empty(self.client_secret.expose_secret(), "bb.client_secret")?;
        ConfigValidator::not_empty(
            self.developer_application_key.expose_secret(),
            "bb.developer_application_key",
        )?;
        ConfigValidator::not_empty(&self.pix_key, "bb.pix_key")?;
        ConfigValidator::in_range(self.expiration_secs, 60, 86_400, "bb.expiration_secs")?;
        ConfigValidator::in_range(self.timeout_secs, 1, 300, "bb.timeout_secs")
    }
}
