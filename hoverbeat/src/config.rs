/*!
 * Session configuration, read from a TOML file.
 *
 * Every field has a default, so a partial file (or no file) is fine.
 */
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub judgement: JudgementConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct JudgementConfig {
    /// How early before its start time an object accepts a hit.
    pub early_tolerance_ms: f64,
    /// Late window of a slider's head.
    pub slider_head_window_ms: f64,
    /// Scale applied to measured spinner rotation.
    pub spinner_sensitivity: f64,
}

impl Default for JudgementConfig {
    fn default() -> Self {
        Self {
            early_tolerance_ms: 20.0,
            slider_head_window_ms: 150.0,
            spinner_sensitivity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub chart_path: Option<PathBuf>,
    pub frame_rate: f64,
    pub pre_roll_ms: f64,
    /// Follow the wall clock instead of stepping as fast as possible.
    pub realtime: bool,
    pub autoplay_rotation_deg_per_frame: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chart_path: None,
            frame_rate: 90.0,
            pre_roll_ms: 1000.0,
            realtime: false,
            autoplay_rotation_deg_per_frame: 12.0,
        }
    }
}

impl SessionConfig {
    /// Milliseconds per simulated frame.
    pub fn frame_duration_ms(&self) -> f64 {
        if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            1000.0 / self.frame_rate
        } else {
            1000.0 / SessionConfig::default().frame_rate
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;

        log::debug!("Loaded config {:?}", config);
        Ok(config)
    }
}
