//! Normalizer configuration module.
//!
//! Handles loading, validating, and merging `imgnorm.toml`. Stock defaults
//! are the base layer; a user config file only needs the keys it overrides,
//! and CLI flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! quality = 95              # WebP encoding quality (0-100)
//! max_dimension = 2560      # Upper bound on the longer edge, in pixels
//! backup = true             # Copy sources into a sibling originals/ first
//!
//! [batch]
//! extensions = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use crate::normalize::NormalizerConfig;
use crate::scan::DEFAULT_EXTENSIONS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "imgnorm.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `imgnorm.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Per-image normalization settings.
    pub images: ImagesConfig,
    /// Directory batch settings.
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality > 100 {
            return Err(ConfigError::Validation("images.quality must be 0-100".into()));
        }
        if self.images.max_dimension == 0 {
            return Err(ConfigError::Validation("images.max_dimension must be non-zero".into()));
        }
        if self.batch.extensions.is_empty() {
            return Err(ConfigError::Validation("batch.extensions must not be empty".into()));
        }
        if self
            .batch
            .extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').is_empty())
        {
            return Err(ConfigError::Validation(
                "batch.extensions entries must not be blank".into(),
            ));
        }
        Ok(())
    }

    /// The explicit value handed to [`Normalizer::new`](crate::normalize::Normalizer::new).
    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            quality: Quality::new(self.images.quality),
            max_dimension: self.images.max_dimension,
            backup_enabled: self.images.backup,
        }
    }
}

/// Per-image normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// WebP encoding quality (0 = smallest, 100 = least loss).
    pub quality: u32,
    /// Upper bound on the longer edge after resize, in pixels.
    pub max_dimension: u32,
    /// Snapshot each source into a sibling `originals/` directory first.
    pub backup: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        let defaults = NormalizerConfig::default();
        Self {
            quality: defaults.quality.value(),
            max_dimension: defaults.max_dimension,
            backup: defaults.backup_enabled,
        }
    }
}

/// Directory batch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// File extensions to pick up, matched case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(AppConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file, falling back to stock defaults when absent.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `imgnorm.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgnorm configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Command-line flags (--quality, --max-dimension, --no-backup) override
# whatever is set here.

# ---------------------------------------------------------------------------
# Per-image normalization
# ---------------------------------------------------------------------------
[images]
# Lossy WebP quality (0 = smallest file, 100 = least loss).
quality = 95

# Upper bound on the longer edge, in pixels. Images already within the
# bound are never upscaled.
max_dimension = 2560

# Copy each source into a sibling originals/ directory before the first
# normalization. Existing backups are never overwritten.
backup = true

# ---------------------------------------------------------------------------
# Directory batches
# ---------------------------------------------------------------------------
[batch]
# Extensions picked up by `imgnorm dir`, matched case-insensitively.
extensions = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif"]
"##
}
