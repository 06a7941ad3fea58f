use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{DiscoveryError, Result};

/// Configuration for logging setup. Either provide an explicit filter via
/// `filter()` or set RUST_LOG; the level is used when neither is present.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub enable_colors: bool,
    pub show_target: bool,
    pub json_format: bool,
    pub filter: Option<String>,
}

impl LogConfig {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            enable_colors: true,
            show_target: false,
            json_format: false,
            filter: None,
        }
    }

    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    pub fn colors(mut self, enable: bool) -> Self {
        self.enable_colors = enable;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn json_format(mut self, enable: bool) -> Self {
        self.json_format = enable;
        self
    }

    pub fn filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Install the global subscriber. Fails if one is already installed.
    pub fn init(self) -> Result<()> {
        let filter = match &self.filter {
            Some(filter) => EnvFilter::try_new(filter).map_err(|e| {
                DiscoveryError::Configuration {
                    message: format!("invalid log filter {:?}", filter),
                    source: Some(Box::new(e)),
                }
            })?,
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.to_string().to_lowercase())),
        };

        // MCP stdio servers own stdout for the protocol; logs go to stderr.
        let writer = std::io::stderr as fn() -> std::io::Stderr;

        let registry = tracing_subscriber::registry().with(filter);
        let result = if self.json_format {
            registry
                .with(fmt::layer().json().with_writer(writer).with_target(self.show_target))
                .try_init()
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(self.enable_colors)
                        .with_target(self.show_target),
                )
                .try_init()
        };

        result.map_err(|e| DiscoveryError::Configuration {
            message: "logger already initialized".to_string(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let config = LogConfig::new(Level::INFO)
            .colors(false)
            .show_target(true)
            .json_format(true)
            .filter("toolscout=debug");

        assert_eq!(config.level, Level::INFO);
        assert!(!config.enable_colors);
        assert!(config.show_target);
        assert!(config.json_format);
        assert_eq!(config.filter.as_deref(), Some("toolscout=debug"));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let err = LogConfig::debug().filter("foo=bar=baz").init().unwrap_err();
        assert!(matches!(err, DiscoveryError::Configuration { .. }));
    }
}
