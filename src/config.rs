// src/config.rs

//! Defines the configuration structures for `frame-canvas`.
//!
//! The structs deserialize from a JSON file named by the `FRAME_CANVAS_CONFIG`
//! environment variable. Every section carries `#[serde(default)]`, so a file
//! only needs to mention the settings it wants to change.

use anyhow::{Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable holding the path of the JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "FRAME_CANVAS_CONFIG";

/// Process-wide configuration, loaded on first access.
///
/// Falls back to [`Config::default`] when the variable is unset or the file
/// cannot be read.
pub static CONFIG: Lazy<Config> = Lazy::new(|| match std::env::var(CONFIG_ENV_VAR) {
    Ok(path) => Config::load(&path).unwrap_or_else(|e| {
        warn!("Config: {:#}. Using defaults.", e);
        Config::default()
    }),
    Err(_) => {
        info!("Config: {} not set, using defaults.", CONFIG_ENV_VAR);
        Config::default()
    }
});

// --- Top-Level Configuration Structure ---

/// Root of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Animation clock settings.
    pub animation: AnimationConfig,
    /// Buffered surface settings.
    pub surface: SurfaceConfig,
    /// Settings used only by the headless demo binary.
    pub demo: DemoConfig,
}

impl Config {
    /// Reads and parses a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Config: loaded from {}", path.display());
        Ok(config)
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid configuration JSON")
    }
}

// --- Animation Configuration ---

/// Settings for the animation driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Initial frame rate in frames per second. Values below 1 are clamped to 1.
    pub frame_rate: i32,
    /// Name given to the driver's background thread.
    pub thread_name: String,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            frame_rate: 50,
            thread_name: "animation".to_string(),
        }
    }
}

// --- Surface Configuration ---

/// Settings for the buffered surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Number of buffers requested for the swap chain.
    pub num_buffers: usize,
    /// Retries of the steady-layer recovery loop after which every further
    /// retry is logged at `warn` instead of `debug`.
    pub recovery_warn_threshold: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        SurfaceConfig {
            num_buffers: 2,
            recovery_warn_threshold: 3,
        }
    }
}

// --- Demo Configuration ---

/// Settings for the headless demo binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    pub width_px: u32,
    pub height_px: u32,
    /// How long the demo animates before terminating.
    pub duration_ms: u64,
    /// Spacing of the background grid drawn into the steady layer.
    pub grid_spacing_px: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            width_px: 320,
            height_px: 200,
            duration_ms: 2000,
            grid_spacing_px: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn it_should_fill_missing_fields_with_defaults() {
        let config = Config::from_json(r#"{ "animation": { "frame_rate": 10 } }"#).unwrap();
        assert_eq!(config.animation.frame_rate, 10);
        assert_eq!(config.animation.thread_name, "animation");
        assert_eq!(config.surface, SurfaceConfig::default());
        assert_eq!(config.demo, DemoConfig::default());
    }

    #[test]
    fn it_should_reject_malformed_json() {
        assert!(Config::from_json("{ animation: ").is_err());
    }

    #[test]
    fn it_should_report_missing_file_with_path() {
        let err = Config::load("/nonexistent/frame-canvas.json").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/frame-canvas.json"));
    }
}
