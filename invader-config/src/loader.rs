//! TOML and JSON configuration files

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Json => "JSON",
            FileFormat::Toml => "TOML",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file extension
    pub fn auto(path: &str) -> Result<Self> {
        let ext = Path::new(path)
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::Load {
                path: path.to_string(),
                message: "no file extension".to_string(),
            })?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::Load {
                path: path.to_string(),
                message: format!("unsupported format {}", ext),
            })?;

        Ok(Self::new(format))
    }

    pub fn load_file(&self, path: &str) -> Result<Value> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        let value = match self.format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            })?,
            FileFormat::Toml => {
                let table: toml::Table =
                    toml::from_str(content).map_err(|e| ConfigError::Parse {
                        format: "TOML",
                        message: e.to_string(),
                    })?;
                serde_json::to_value(table)
                    .map_err(|e| ConfigError::Serialization(e.to_string()))?
            }
        };

        match value {
            Value::Object(_) => Ok(value),
            _ => Err(ConfigError::Parse {
                format: self.format.name(),
                message: "the root must be a table".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_sections() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            [server]
            port = 8069

            [bb]
            pix_key = "pix@example.com"
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["server"]["port"], 8069);
        assert_eq!(result["bb"]["pix_key"], "pix@example.com");
    }

    #[test]
    fn test_parse_json_root_must_be_object() {
        let loader = ConfigLoader::new(FileFormat::Json);
        assert!(loader.parse(r#"{"key": "value"}"#).is_ok());
        assert!(matches!(loader.parse("[1, 2]"), Err(ConfigError::Parse { format: "JSON", .. })));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("JSON"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("toml"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("ini"), None);
        assert!(ConfigLoader::auto("invader").is_err());
    }
}
