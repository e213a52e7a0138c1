//! Settings for indexing, payload loading, aggregation and logging
//!
//! Read from TOML, then overridden by `MEASURESET_*` environment variables.

use crate::aggregate::Statistic;
use crate::index::IndexOptions;
use crate::payload::DEFAULT_AXIS;
use crate::storage::{FILENAME_FIELD, META_DATA_FILE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level settings, one table per section
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub payload: PayloadConfig,

    #[serde(default)]
    pub aggregate: AggregateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage location configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_meta_data_file")]
    pub meta_data_file: String,

    #[serde(default = "default_filename_field")]
    pub filename_field: String,
}

fn default_data_dir() -> String {
    ".".to_string()
}

fn default_meta_data_file() -> String {
    META_DATA_FILE.to_string()
}

fn default_filename_field() -> String {
    FILENAME_FIELD.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            meta_data_file: default_meta_data_file(),
            filename_field: default_filename_field(),
        }
    }
}

impl StorageConfig {
    /// Scan options for the metadata index
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            meta_data_file: self.meta_data_file.clone(),
            filename_field: self.filename_field.clone(),
        }
    }
}

/// Payload loading configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PayloadConfig {
    #[serde(default = "default_axis_column")]
    pub axis_column: String,
}

fn default_axis_column() -> String {
    DEFAULT_AXIS.to_string()
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            axis_column: default_axis_column(),
        }
    }
}

/// Aggregation configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AggregateConfig {
    /// Payloads loaded at once; 0 uses every available core
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    #[serde(default)]
    pub statistic: Statistic,
}

fn default_parallelism() -> usize {
    4
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            statistic: Statistic::default(),
        }
    }
}

/// Subscriber settings, see [`crate::logging`]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(path, &content)
    }

    /// Parse configuration text. `path` is only used in error messages.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// A TOML file plus environment overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// First readable file among the default locations, else [`Config::from_env`]
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("measureset").join("config.toml")),
            Some(PathBuf::from("./measureset.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Override fields from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any `MEASURESET_*` variable lookup.
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Storage overrides
        if let Some(data_dir) = lookup("MEASURESET_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }
        if let Some(file) = lookup("MEASURESET_META_DATA_FILE") {
            self.storage.meta_data_file = file;
        }
        if let Some(field) = lookup("MEASURESET_FILENAME_FIELD") {
            self.storage.filename_field = field;
        }

        // Payload overrides
        if let Some(axis) = lookup("MEASURESET_AXIS_COLUMN") {
            self.payload.axis_column = axis;
        }

        // Aggregate overrides
        if let Some(parallelism) = lookup("MEASURESET_PARALLELISM") {
            match parallelism.parse() {
                Ok(p) => self.aggregate.parallelism = p,
                Err(_) => tracing::warn!("Ignoring MEASURESET_PARALLELISM={}", parallelism),
            }
        }
        if let Some(statistic) = lookup("MEASURESET_STATISTIC") {
            match statistic.parse() {
                Ok(s) => self.aggregate.statistic = s,
                Err(e) => tracing::warn!("Ignoring MEASURESET_STATISTIC: {}", e),
            }
        }

        // Logging overrides
        if let Some(level) = lookup("MEASURESET_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MEASURESET_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Failed to render config: {0}")]
    Serialize(String),

    #[error("Failed to set up logging: {0}")]
    Logging(String),
}

/// Commented config file matching [`Config::default`]
pub fn generate_default_config() -> String {
    r#"# Measureset Configuration
#
# Environment variables override these settings:
# - MEASURESET_DATA_DIR
# - MEASURESET_META_DATA_FILE
# - MEASURESET_FILENAME_FIELD
# - MEASURESET_AXIS_COLUMN
# - MEASURESET_PARALLELISM
# - MEASURESET_STATISTIC
# - MEASURESET_LOG_LEVEL
# - MEASURESET_LOG_FORMAT

[storage]
# Directory holding the measurements
data_dir = "."

# Metadata table inside data_dir; without it the file headings are scanned
meta_data_file = "meta_data.csv"

# Metadata column naming each measurement's payload file
filename_field = "filename"

[payload]
# Column used as the independent axis (first column if missing)
axis_column = "time"

[aggregate]
# Payloads loaded at once (0 = all cores)
parallelism = 4

# Default statistic: mean, median, min, max, sum, std
statistic = "mean"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/measureset/measureset.log"
"#
    .to_string()
}
