// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON at `$XDG_CONFIG_HOME/survey-camera/config.json`. A missing
//! file yields the defaults; a malformed one is reported and ignored.

use crate::backends::camera::types::{Framerate, ProbeCandidate, Resolution, SensorRotation};
use crate::constants;
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::EncodingFormat;
use crate::storage::{self, MeasurementType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "survey-camera";
const CONFIG_FILE: &str = "config.json";

/// Longest accepted transient status
const MAX_STATUS_FLASH_SECS: f32 = 3600.0;
/// Longest accepted device read
const MAX_READ_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ordered (index, backend) candidates tried during device discovery
    pub candidates: Vec<ProbeCandidate>,
    /// Resolution forced while probing; `None` keeps the device default
    pub probe_resolution: Option<Resolution>,
    /// Frame pump ticks per second
    pub tick_rate_hz: u32,
    /// Frame rate written into recordings
    pub recording_fps: u32,
    /// Fixed orientation correction in degrees (0, 90, 180, 270)
    pub rotation: SensorRotation,
    /// Whether recordings can truly be paused on this platform
    pub pause_supported: bool,
    /// Height of the preview texture
    pub preview_height: u32,
    /// Photo file format
    pub photo_format: EncodingFormat,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Seconds a transient status stays visible
    pub status_flash_secs: f32,
    /// Upper bound for one device read in milliseconds
    pub read_timeout_ms: u64,
    /// Directory captures are written to
    pub output_dir: PathBuf,
    /// Measurement type used for file prefixes
    pub measurement_type: MeasurementType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            candidates: ProbeCandidate::default_table(constants::PROBE_INDEX_COUNT),
            probe_resolution: Some(Resolution::new(
                constants::PROBE_BASE_WIDTH,
                constants::PROBE_BASE_HEIGHT,
            )),
            tick_rate_hz: constants::DEFAULT_TICK_RATE_HZ,
            recording_fps: constants::DEFAULT_RECORDING_FPS,
            rotation: SensorRotation::None,
            pause_supported: true,
            preview_height: constants::DEFAULT_PREVIEW_HEIGHT,
            photo_format: EncodingFormat::Jpeg,
            jpeg_quality: constants::DEFAULT_JPEG_QUALITY,
            status_flash_secs: constants::DEFAULT_STATUS_FLASH.as_secs_f32(),
            read_timeout_ms: constants::DEFAULT_READ_TIMEOUT.as_millis() as u64,
            output_dir: storage::default_output_dir(),
            measurement_type: MeasurementType::default(),
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory on this system, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            storage::ensure_dir(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.tick_rate_hz == 0 {
            return Err(AppError::Config("tick_rate_hz must be positive".into()));
        }
        if self.recording_fps == 0 {
            return Err(AppError::Config("recording_fps must be positive".into()));
        }
        if self.preview_height == 0 {
            return Err(AppError::Config("preview_height must be positive".into()));
        }
        if !(0.0..=MAX_STATUS_FLASH_SECS).contains(&self.status_flash_secs) {
            return Err(AppError::Config(format!(
                "status_flash_secs must be between 0 and {}",
                MAX_STATUS_FLASH_SECS
            )));
        }
        if self.read_timeout_ms > MAX_READ_TIMEOUT_MS {
            return Err(AppError::Config(format!(
                "read_timeout_ms must be at most {}",
                MAX_READ_TIMEOUT_MS
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }

    pub fn recording_framerate(&self) -> Framerate {
        Framerate::from_int(self.recording_fps)
    }

    pub fn status_flash(&self) -> Duration {
        // Values built in code skip validate(); clamp instead of panicking
        Duration::try_from_secs_f32(self.status_flash_secs.clamp(0.0, MAX_STATUS_FLASH_SECS))
            .unwrap_or(constants::DEFAULT_STATUS_FLASH)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.min(MAX_READ_TIMEOUT_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_interval() {
        let config = Config {
            tick_rate_hz: 25,
            ..Config::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(40));
    }

    #[test]
    fn test_validate_rejects_zero_rates() {
        let config = Config {
            recording_fps: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_durations_are_clamped() {
        let config = Config {
            status_flash_secs: f32::NAN,
            read_timeout_ms: u64::MAX,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.status_flash(), constants::DEFAULT_STATUS_FLASH);
        assert_eq!(config.read_timeout(), Duration::from_millis(MAX_READ_TIMEOUT_MS));

        let config = Config {
            status_flash_secs: 1e30,
            ..Config::default()
        };
        assert_eq!(config.status_flash(), Duration::from_secs(3600));
    }
}
