//! Proxy configuration module.
//!
//! Handles loading, validating, and merging the proxy's TOML config. Stock
//! defaults are the base layer; a user config file overrides any subset of
//! keys on top of them.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! # Engine identifiers in selection order. First engine whose applicability
//! # test accepts the payload wins; an engine without a test always matches.
//! engines = ["gif", "large", "raster"]
//!
//! [headers]
//! engine = "Engine"                  # Header naming the selected engine
//! processing_time = "ProcessingTime" # Header carrying the cycle duration (ms)
//!
//! [metrics]
//! prefix = "engine.process_time"     # Timing metric is "<prefix>.<engine>"
//!
//! [output]
//! quality = 90                       # Default lossy encoding quality (1-100)
//!
//! [large]
//! min_pixels = 10000000              # Pixel count at which `large` claims a payload
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Proxy configuration.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// Engine identifiers in selection priority order.
    pub engines: Vec<String>,
    /// Response header names.
    pub headers: HeadersConfig,
    /// Timing metric naming.
    pub metrics: MetricsConfig,
    /// Encoding defaults.
    pub output: OutputConfig,
    /// Settings for the `large` engine.
    pub large: LargeConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            engines: vec!["gif".into(), "large".into(), "raster".into()],
            headers: HeadersConfig::default(),
            metrics: MetricsConfig::default(),
            output: OutputConfig::default(),
            large: LargeConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engines.is_empty() {
            return Err(ConfigError::Validation("engines must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for id in &self.engines {
            if id.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "engines must not contain empty identifiers".into(),
                ));
            }
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "engine '{id}' is listed more than once"
                )));
            }
        }
        if self.headers.engine.trim().is_empty() || self.headers.processing_time.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "header names must not be empty".into(),
            ));
        }
        if self.metrics.prefix.trim().is_empty() {
            return Err(ConfigError::Validation(
                "metrics.prefix must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.large.min_pixels == 0 {
            return Err(ConfigError::Validation(
                "large.min_pixels must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Default encoding quality as the engines take it.
    pub fn quality(&self) -> Quality {
        Quality::new(self.output.quality)
    }

    /// Full timing metric name for an engine, e.g. `engine.process_time.raster`.
    pub fn metric_name(&self, engine_id: &str) -> String {
        format!("{}.{}", self.metrics.prefix, engine_id)
    }
}

/// Response header names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeadersConfig {
    pub engine: String,
    pub processing_time: String,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            engine: "Engine".into(),
            processing_time: "ProcessingTime".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: "engine.process_time".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Lossy encoding quality used when `read` is called without one.
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LargeConfig {
    /// Minimum `width * height` read from the payload header.
    pub min_pixels: u64,
}

impl Default for LargeConfig {
    fn default() -> Self {
        Self {
            min_pixels: 10_000_000,
        }
    }
}

/// The stock defaults as a TOML table, the base layer every config file is
/// merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ProxyConfig::default())?)
}

/// Overlay `user` onto `base`.
///
/// Sections merge key by key, so a file that only sets `headers.engine`
/// keeps the stock `headers.processing_time`. Anything that is not a table
/// is replaced whole: a user `engines` list replaces the stock list.
pub fn merge_toml(base: toml::Value, user: toml::Value) -> toml::Value {
    match (base, user) {
        (toml::Value::Table(mut merged), toml::Value::Table(user)) => {
            for (key, value) in user {
                let value = match merged.remove(&key) {
                    Some(stock) => merge_toml(stock, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, user) => user,
    }
}

/// Parse a config file into a raw TOML value.
///
/// The path was named explicitly, so a missing file is an error rather than
/// a silent fall back to the defaults.
pub fn read_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load the proxy config.
///
/// Without a path the stock defaults apply. With one, the file must exist;
/// its values are merged over the defaults, unknown keys are rejected and
/// the result is validated.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut value = stock_defaults_value()?;
    if let Some(path) = path {
        value = merge_toml(value, read_config_file(path)?);
    }
    let config: ProxyConfig = value.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# engine-proxy configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Engine identifiers, in selection order. For every request the first engine
# whose applicability test accepts the payload handles the whole cycle.
# Engines without a test (raster) always match, so list them last.
#
# Built-in engines:
#   gif    - animated GIFs, keeps every frame
#   large  - payloads whose header declares at least large.min_pixels pixels
#   raster - everything else (fallback)
engines = ["gif", "large", "raster"]

# ---------------------------------------------------------------------------
# Response headers
# ---------------------------------------------------------------------------
[headers]
# Names the engine selected for the request.
engine = "Engine"

# Milliseconds between load and read, rounded to the nearest millisecond.
processing_time = "ProcessingTime"

# ---------------------------------------------------------------------------
# Metrics
# ---------------------------------------------------------------------------
[metrics]
# Timing samples are named "<prefix>.<engine>".
prefix = "engine.process_time"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Lossy encoding quality (1 = worst, 100 = best) when none is requested.
quality = 90

# ---------------------------------------------------------------------------
# Large image engine
# ---------------------------------------------------------------------------
[large]
# Pixel count (width * height) at which the large engine claims a payload.
min_pixels = 10000000
"##
}
