//! Configuration errors. Any of them aborts startup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing configuration key {0}")]
    KeyNotFound(String),

    #[error("cannot load {path}: {message}")]
    Load { path: String, message: String },

    #[error("invalid {format} configuration: {message}")]
    Parse { format: &'static str, message: String },

    /// A section value failed its [`crate::Validate`] checks
    #[error("{field} {message}")]
    Invalid { field: String, message: String },

    #[error("cannot encode configuration value: {0}")]
    Serialization(String),

    #[error("configuration key {key} has the wrong shape: {message}")]
    Deserialization { key: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("environment variable {name}: {source}")]
    Env {
        name: String,
        #[source]
        source: std::env::VarError,
    },
}

impl ConfigError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
