//! Engine configuration module.
//!
//! Handles loading, validating, and merging a `config.toml`. Stock defaults
//! are the base layer; a user file overrides only the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [registry.preferred]
//! "image/webp" = "image-webp"  # Provider kept when several claim a media type
//!
//! [encoding]
//! quality = 90              # JPEG/AVIF quality (1-100)
//! avif_speed = 6            # rav1e speed preset (1-10, higher = faster)
//!
//! [resize]
//! filter = "lanczos3"       # nearest | triangle | catmull-rom | gaussian | lanczos3
//!
//! [processing]
//! max_processes = 4         # Max parallel workers for batch thumbnails (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::params::{AvifSpeed, Quality, ResampleFilter};
use crate::imaging::{EncodeSettings, rust_providers};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Codec provider tie-break preferences.
    pub registry: RegistryConfig,
    /// Encoder settings.
    pub encoding: EncodingConfig,
    /// Resampling settings.
    pub resize: ResizeConfig,
    /// Parallel batch settings.
    pub processing: ProcessingConfig,
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.encoding.quality) {
            return Err(ConfigError::Validation(
                "encoding.quality must be 1-100".into(),
            ));
        }
        if !(1..=10).contains(&self.encoding.avif_speed) {
            return Err(ConfigError::Validation(
                "encoding.avif_speed must be 1-10".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        for (media_type, identity) in &self.registry.preferred {
            if !media_type.contains('/') || identity.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "registry.preferred entry \"{media_type}\" = \"{identity}\" is not a media type/provider pair"
                )));
            }
        }
        Ok(())
    }
}

/// Codec registry preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Media type → provider identity to keep when several providers claim it.
    pub preferred: BTreeMap<String, String>,
}

impl RegistryConfig {
    /// No preferences at all. Any competing claim becomes a startup error.
    pub fn empty() -> Self {
        Self {
            preferred: BTreeMap::new(),
        }
    }

    /// Add or replace the preferred provider for one media type.
    pub fn preferring(mut self, media_type: &str, identity: &str) -> Self {
        self.preferred
            .insert(media_type.to_ascii_lowercase(), identity.to_string());
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let mut preferred = BTreeMap::new();
        preferred.insert(
            "image/webp".to_string(),
            rust_providers::IMAGE_WEBP.to_string(),
        );
        Self { preferred }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// JPEG/AVIF quality (1 = worst, 100 = best).
    pub quality: u32,
    /// rav1e speed preset for AVIF output.
    pub avif_speed: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            avif_speed: 6,
        }
    }
}

impl EncodingConfig {
    pub fn settings(&self) -> EncodeSettings {
        EncodeSettings {
            quality: Quality::new(self.quality),
            avif_speed: AvifSpeed::new(self.avif_speed),
        }
    }
}

/// Resampling settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub filter: ResampleFilter,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(EngineConfig::default())
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

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<EngineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file, or the stock defaults when `path` is `None`.
///
/// A named file that does not exist is an error: a typo in `--config`
/// should not silently fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pagecodec configuration
# =======================
# All options are optional. Values shown are the defaults.

[registry.preferred]
# When more than one codec provider claims the same media type, the provider
# named here stays active and the others are deregistered for that type.
# A conflict with no preference (and no unique best rank) stops startup.
"image/webp" = "image-webp"

[encoding]
# Lossy quality for JPEG and AVIF output (1-100).
quality = 90
# rav1e speed preset for AVIF output (1 = slowest/smallest, 10 = fastest).
avif_speed = 6

[resize]
# Resampling kernel used when shrinking:
# nearest | triangle | catmull-rom | gaussian | lanczos3
filter = "lanczos3"

[processing]
# Maximum parallel workers for batch thumbnail generation.
# Omit to use all CPU cores. Larger values are clamped to the core count.
# max_processes = 4
"##
}
