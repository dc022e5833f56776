//! Handler configuration.

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Feature switches for the marketplace handler.
///
/// Can be loaded from a TOML/JSON/YAML file; `LISTENER_<FIELD>` environment
/// variables override file values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Master switch. When off, logs are acknowledged without any work.
    pub marketplace: bool,
    /// Project listings into the search index.
    pub elasticsearch: bool,
    /// Record growth ledger entries.
    pub growth: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            marketplace: true,
            elasticsearch: false,
            growth: false,
        }
    }
}

impl HandlerConfig {
    /// Loads the configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("LISTENER").try_parsing(true))
            .build()
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        config
            .try_deserialize()
            .with_context(|| format!("invalid handler config in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::default();
        assert!(config.marketplace);
        assert!(!config.elasticsearch);
        assert!(!config.growth);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "elasticsearch = true\ngrowth = true").unwrap();

        let config = HandlerConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config,
            HandlerConfig {
                marketplace: true,
                elasticsearch: true,
                growth: true,
            }
        );
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "marketplace": false }}"#).unwrap();

        let config = HandlerConfig::from_file(file.path()).unwrap();
        assert!(!config.marketplace);
        assert!(!config.growth);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(HandlerConfig::from_file("/nonexistent/listener.toml").is_err());
    }
}
