// Configuration loading and validation (retrostat.toml).
//
// Every section is optional; a missing file yields the defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "retrostat.toml";

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www.retrosheet.org/downloads/{year}/{year}csvs.zip";

/// Beyond this many digits an f64 carries no further decimal precision.
pub const MAX_PRECISION: u32 = 15;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub provisioner: ProvisionerConfig,
    pub store: StoreConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding one `<year>/` subdirectory per season.
    pub root: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("retrosheet"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    /// Archive URL; every `{year}` is replaced with the season.
    pub url_template: String,
    /// Download timeout. Unset means wait indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path; `:memory:` keeps the store process-local.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub default_precision: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            default_precision: crate::metrics::DEFAULT_PRECISION,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate configuration from TOML text. `path` is only used for
/// error reporting.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from `path`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config(&text, path)
}

/// Load configuration from an explicit path, or from `retrostat.toml` in the
/// current directory when it exists. Falls back to defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config_from(path),
        None => {
            let default_path = Path::new(CONFIG_FILE_NAME);
            if default_path.exists() {
                load_config_from(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.data.root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data.root".into(),
            message: "must not be empty".into(),
        });
    }

    if !config.provisioner.url_template.contains("{year}") {
        return Err(ConfigError::ValidationError {
            field: "provisioner.url_template".into(),
            message: format!(
                "must contain a {{year}} placeholder, got {}",
                config.provisioner.url_template
            ),
        });
    }

    if config.store.path.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "store.path".into(),
            message: "must not be empty".into(),
        });
    }

    let precision = config.metrics.default_precision;
    if precision > MAX_PRECISION {
        return Err(ConfigError::ValidationError {
            field: "metrics.default_precision".into(),
            message: format!("must be at most {MAX_PRECISION}, got {precision}"),
        });
    }

    Ok(())
}
