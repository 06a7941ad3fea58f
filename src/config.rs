// Server configuration: a TOML file plus environment overrides. Only the
// binary uses this; the library types take their options programmatically.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};
use crate::registry::{RegistryConfig, ServerInfo};
use crate::search::Bm25Config;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    /// Server identity advertised via `initialize`.
    pub server_name: String,
    pub server_version: String,
    /// Protocol version override; empty uses the built-in default.
    pub protocol_version: String,

    /// BM25 field boosts and caps.
    pub name_boost: f32,
    pub namespace_boost: f32,
    pub tags_boost: f32,
    pub max_docs: usize,
    pub max_doc_text_len: usize,

    /// Log level when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_name: "toolscout".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: String::new(),
            name_boost: 3.0,
            namespace_boost: 2.0,
            tags_boost: 2.0,
            max_docs: 0,
            max_doc_text_len: 0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| DiscoveryError::Configuration {
            message: format!("failed to read config {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        let mut config: Config =
            toml::from_str(&raw).map_err(|e| DiscoveryError::Configuration {
                message: format!("invalid config {}", path.display()),
                source: Some(Box::new(e)),
            })?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(name) = std::env::var("TOOLSCOUT_SERVER_NAME") {
            self.server_name = name;
        }
        if let Ok(level) = std::env::var("TOOLSCOUT_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(version) = std::env::var("TOOLSCOUT_PROTOCOL_VERSION") {
            self.protocol_version = version;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_name.trim().is_empty() {
            return Err(DiscoveryError::Configuration {
                message: "server_name must not be empty".to_string(),
                source: None,
            });
        }
        if !(self.name_boost > 0.0 && self.namespace_boost > 0.0 && self.tags_boost > 0.0) {
            return Err(DiscoveryError::Configuration {
                message: "field boosts must be positive".to_string(),
                source: None,
            });
        }
        Ok(())
    }

    pub fn bm25(&self) -> Bm25Config {
        Bm25Config {
            name_boost: self.name_boost,
            namespace_boost: self.namespace_boost,
            tags_boost: self.tags_boost,
            max_docs: (self.max_docs > 0).then_some(self.max_docs),
            max_doc_text_len: (self.max_doc_text_len > 0).then_some(self.max_doc_text_len),
        }
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            search: Some(self.bm25()),
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
            },
            backend_selector: None,
            protocol_version: (!self.protocol_version.is_empty())
                .then(|| self.protocol_version.clone()),
        }
    }
}
