// Configuration management for the Invader payment services

pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Prefix of the environment variables read by [`ConfigManager::load_env`]
pub const ENV_PREFIX: &str = "INVADER";

/// Layered configuration: later loads override earlier ones key by key.
///
/// Keys are dotted paths (`pagseguro.base_url`); files contribute nested
/// tables and environment variables use `__` for nesting.
#[derive(Clone)]
pub struct ConfigManager {
    values: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            values: Arc::new(RwLock::new(Map::new())),
            env_prefix: None,
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            values: Arc::new(RwLock::new(Map::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Manager reading `INVADER_*` variables
    pub fn from_default_env() -> Self {
        Self::with_prefix(ENV_PREFIX)
    }

    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let mut values = self.values.write();
        for (key, raw) in loader.load()? {
            insert_path(&mut values, &key, env::typed_value(&raw));
        }
        Ok(())
    }

    /// Load a `.env` file into the process environment, then the variables
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::Load {
                    path: path.to_string(),
                    message: e.to_string(),
                })?;
            }
            None => {
                // A missing .env is not an error
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    pub fn load_file(&self, path: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data);
        Ok(())
    }

    /// Load a file, picking the format from its extension
    pub fn load_file_auto(&self, path: &str) -> Result<()> {
        let data = ConfigLoader::auto(path)?.load_file(path)?;
        self.merge_value(data);
        Ok(())
    }

    /// Merge a parsed document (must be an object) into the configuration
    pub fn merge_value(&self, data: Value) {
        if let Value::Object(map) = data {
            let mut values = self.values.write();
            for (key, value) in map {
                insert_path(&mut values, &key, value);
            }
        }
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;
        insert_path(&mut self.values.write(), key, json_value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::Deserialization {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Deserialize and validate a typed section
    pub fn section<T: DeserializeOwned + Validate>(&self, key: &str) -> Result<T> {
        let section: T = self.get(key)?;
        section.validate()?;
        Ok(section)
    }

    /// Like [`ConfigManager::section`], falling back to `T::default()` when
    /// the section is absent. The default is validated too.
    pub fn section_or_default<T: DeserializeOwned + Validate + Default>(
        &self,
        key: &str,
    ) -> Result<T> {
        if self.has(key) {
            self.section(key)
        } else {
            let section = T::default();
            section.validate()?;
            Ok(section)
        }
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let values = self.values.read();
        let mut parts = key.split('.');
        let mut current = values.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current.clone())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_path(root: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            if let Value::Object(incoming) = value {
                if let Some(Value::Object(existing)) = root.get_mut(key) {
                    for (k, v) in incoming {
                        insert_path(existing, &k, v);
                    }
                    return;
                }
                root.insert(key.to_string(), Value::Object(incoming));
            } else {
                root.insert(key.to_string(), value);
            }
        }
        Some((head, rest)) => {
            let entry = root
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}
