// SPDX-License-Identifier: MPL-2.0

//! Capture target and file naming for photos and videos
//!
//! Files land directly in the current survey location folder:
//! `{dir}/{prefix}_Foto_{HHMMSS}.jpg` and `{dir}/{prefix}_Video_{HHMMSS}.mp4`.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix used for fire-extinguisher photos
pub const EXTINGUISHER_PREFIX: &str = "EXT";

/// Inspection discipline the survey belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    #[default]
    Ergonomics,
    FireSafety,
    Noise,
    Lighting,
    Grounding,
    Thermography,
}

impl MeasurementType {
    pub const ALL: [MeasurementType; 6] = [
        MeasurementType::Ergonomics,
        MeasurementType::FireSafety,
        MeasurementType::Noise,
        MeasurementType::Lighting,
        MeasurementType::Grounding,
        MeasurementType::Thermography,
    ];

    /// Survey code written into reports and folder names
    pub fn code(&self) -> &'static str {
        match self {
            MeasurementType::Ergonomics => "ERGONOMIA",
            MeasurementType::FireSafety => "INCENDIOS",
            MeasurementType::Noise => "RUIDO",
            MeasurementType::Lighting => "ILUMINACION",
            MeasurementType::Grounding => "PAT",
            MeasurementType::Thermography => "TERMOGRAFIA",
        }
    }

    /// Filename prefix: the first three characters of the survey code
    pub fn prefix(&self) -> String {
        self.code().chars().take(3).collect()
    }

    /// Fire-safety surveys also photograph extinguishers
    pub fn has_extinguisher_photos(&self) -> bool {
        matches!(self, MeasurementType::FireSafety)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MeasurementType::Ergonomics => "Ergonomics",
            MeasurementType::FireSafety => "Fire safety",
            MeasurementType::Noise => "Noise",
            MeasurementType::Lighting => "Lighting",
            MeasurementType::Grounding => "Grounding",
            MeasurementType::Thermography => "Thermography",
        }
    }
}

impl std::fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for MeasurementType {
    type Err = String;

    /// Accepts the survey code (`INCENDIOS`) or its prefix (`INC`), any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        MeasurementType::ALL
            .into_iter()
            .find(|m| m.code() == wanted || m.prefix() == wanted)
            .ok_or_else(|| format!("unknown measurement type: {}", s))
    }
}

/// Kind of persisted capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Photo,
    Video,
}

impl CaptureKind {
    fn label(&self) -> &'static str {
        match self {
            CaptureKind::Photo => "Foto",
            CaptureKind::Video => "Video",
        }
    }
}

/// Where captures are written and how they are named
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub dir: PathBuf,
    pub prefix: String,
}

impl CaptureTarget {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn for_measurement(dir: impl Into<PathBuf>, measurement: MeasurementType) -> Self {
        Self::new(dir, measurement.prefix())
    }

    /// Path for a capture taken at `time`
    pub fn path_for(
        &self,
        prefix: &str,
        kind: CaptureKind,
        extension: &str,
        time: DateTime<Local>,
    ) -> PathBuf {
        self.dir
            .join(capture_file_name(prefix, kind, extension, time))
    }

    /// Create the output directory if needed, then return the capture path
    ///
    /// A capture taken in the same second as an existing file gets a `_1`,
    /// `_2`, ... suffix instead of overwriting it.
    pub fn prepare(
        &self,
        prefix: &str,
        kind: CaptureKind,
        extension: &str,
    ) -> std::io::Result<PathBuf> {
        ensure_dir(&self.dir)?;
        Ok(unused_path(self.path_for(prefix, kind, extension, Local::now())))
    }
}

/// `{prefix}_{Foto|Video}_{HHMMSS}.{extension}`
pub fn capture_file_name(
    prefix: &str,
    kind: CaptureKind,
    extension: &str,
    time: DateTime<Local>,
) -> String {
    format!(
        "{}_{}_{}.{}",
        prefix,
        kind.label(),
        time.format("%H%M%S"),
        extension
    )
}

/// `path`, or the first `{stem}_{n}.{ext}` sibling that does not exist yet
fn unused_path(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let free = (1u32..)
        .map(|n| path.with_file_name(format!("{}_{}{}", stem, n, extension)))
        .find(|candidate| !candidate.exists());
    free.unwrap_or(path)
}

/// Create `dir` and its parents when missing
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "Creating output directory");
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Default output directory for captures
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("survey-camera")
}
