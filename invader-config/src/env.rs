// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::env;

/// Separator between nesting levels in variable names
/// (`INVADER_PAGSEGURO__BASE_URL` → `pagseguro.base_url`).
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Variables under the prefix, keyed by lowercased dotted path
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    fn collect(&self, vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
        vars.filter_map(|(key, value)| {
            let stripped = match &self.prefix {
                Some(prefix) => key
                    .strip_prefix(prefix.as_str())?
                    .strip_prefix('_')?
                    .to_string(),
                None => key,
            };
            let path = stripped
                .split(NESTING_SEPARATOR)
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(".");
            Some((path, value))
        })
        .collect()
    }

    /// Load a single variable (`key` is upper-cased and prefixed)
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(|source| ConfigError::Env {
            name: full_key.clone(),
            source,
        })
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Interpret a raw variable: numbers, booleans and JSON arrays are typed,
/// everything else stays a string.
pub fn typed_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Array(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_prefix_and_nesting() {
        let loader = EnvLoader::new(Some("INVADER".to_string()));
        let loaded = loader.collect(vars(&[
            ("INVADER_PAGSEGURO__BASE_URL", "https://sandbox.api.pagseguro.com"),
            ("INVADER_SERVER__PORT", "8069"),
            ("INVADERX_IGNORED", "1"),
            ("PATH", "/usr/bin"),
        ]));

        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get("pagseguro.base_url").map(String::as_str),
            Some("https://sandbox.api.pagseguro.com")
        );
        assert_eq!(loaded.get("server.port").map(String::as_str), Some("8069"));
    }

    #[test]
    fn test_typed_values() {
        assert_eq!(typed_value("8069"), Value::from(8069));
        assert_eq!(typed_value("true"), Value::Bool(true));
        assert_eq!(typed_value("[3, 4]"), serde_json::json!([3, 4]));
        assert_eq!(typed_value("sk_live"), Value::from("sk_live"));
        assert_eq!(typed_value("{\"a\": 1}"), Value::from("{\"a\": 1}"));
    }

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new(None);
        assert_eq!(loader.load_var_or("NONEXISTENT_VAR_12345", "default"), "default");
    }
}
