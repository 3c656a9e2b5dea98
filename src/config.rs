//! Configuration file handling.
//!
//! Settings come from an optional `edustat.toml`; every field has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::DataSource;
use crate::engine::DEFAULT_MISSING_GROUP;

/// File name looked up by [`Config::load_default`].
pub const DEFAULT_CONFIG_FILE: &str = "edustat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where the dataset comes from.
    #[serde(default)]
    pub data: DataConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Data source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// File path or `http(s)://` URL.
    #[serde(default = "default_source")]
    pub source: String,

    /// Timeout for HTTP sources.
    #[serde(default = "default_timeout")]
    pub http_timeout_seconds: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            http_timeout_seconds: default_timeout(),
        }
    }
}

impl DataConfig {
    /// Interpret `source` as a URL or a file path.
    pub fn source(&self) -> DataSource {
        let source = self.source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            DataSource::Url(source.to_string())
        } else {
            DataSource::File(PathBuf::from(source))
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

fn default_source() -> String {
    "data/integrated_education_data.csv".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Aggregation engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Group label for records whose group field is missing.
    #[serde(default = "default_missing_group_label")]
    pub missing_group_label: String,

    /// Bin count requested for achievement histograms.
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            missing_group_label: default_missing_group_label(),
            histogram_bins: default_histogram_bins(),
        }
    }
}

fn default_missing_group_label() -> String {
    DEFAULT_MISSING_GROUP.to_string()
}

fn default_histogram_bins() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
