// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;
use std::time::Instant;

/// Backend hint used when opening a probe candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendHint {
    /// Let the media framework pick a source
    #[default]
    Default,
    /// The platform's native camera service (PipeWire on Linux desktops)
    PlatformNative,
    /// Explicit Video4Linux device node
    V4l2,
}

impl BackendHint {
    /// Hints in the order they are crossed with each device index
    pub const ALL: [BackendHint; 3] = [
        BackendHint::Default,
        BackendHint::PlatformNative,
        BackendHint::V4l2,
    ];
}

impl std::fmt::Display for BackendHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendHint::Default => write!(f, "default"),
            BackendHint::PlatformNative => write!(f, "platform-native"),
            BackendHint::V4l2 => write!(f, "v4l2"),
        }
    }
}

/// One (device index, backend hint) pair tried during device discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeCandidate {
    pub index: u32,
    pub backend: BackendHint,
}

impl ProbeCandidate {
    pub fn new(index: u32, backend: BackendHint) -> Self {
        Self { index, backend }
    }

    /// Indices `0..count` crossed with every backend hint, index-major
    pub fn default_table(count: u32) -> Vec<ProbeCandidate> {
        (0..count)
            .flat_map(|index| {
                BackendHint::ALL
                    .into_iter()
                    .map(move |backend| ProbeCandidate::new(index, backend))
            })
            .collect()
    }
}

impl std::fmt::Display for ProbeCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} ({})", self.index, self.backend)
    }
}

/// Capture resolution request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Fixed orientation correction applied to every captured frame (clockwise)
///
/// The correction is a static per-platform setting: handheld devices usually
/// mount the sensor at 90° or 270° relative to the display, desktops at 0°.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorRotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    ///
    /// Values that are not a multiple of 90 map to no rotation.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

impl Serialize for SensorRotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.degrees())
    }
}

impl<'de> Deserialize<'de> for SensorRotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let degrees = i32::deserialize(deserializer)?;
        Ok(SensorRotation::from_degrees(degrees))
    }
}

/// Framerate as a fraction (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    pub fn from_int(fps: u32) -> Self {
        Self::new(fps.max(1), 1)
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Duration of one frame in nanoseconds
    pub fn frame_duration_ns(&self) -> u64 {
        if self.num == 0 {
            return 0;
        }
        1_000_000_000u64 * self.denom as u64 / self.num as u64
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self { num: 30, denom: 1 }
    }
}

/// A single captured frame, tightly packed RGB24
///
/// Pixel data is reference counted so the clean frame slot, the recorder
/// and photo capture can share one buffer without copying.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    /// When the frame was pulled from the device
    pub captured_at: Instant,
}

impl Frame {
    pub const BYTES_PER_PIXEL: usize = 3;

    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            captured_at: Instant::now(),
        }
    }

    /// Expected buffer length for the frame dimensions
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::BYTES_PER_PIXEL
    }

    /// A frame is usable when it has real dimensions and a complete buffer.
    ///
    /// Some backends open successfully and then hand out zero-sized or
    /// truncated buffers; those frames are rejected.
    pub fn is_usable(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == Self::expected_len(self.width, self.height)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copy into an `image` buffer for transforms and encoding
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.to_vec())
    }

    /// Build a frame from an `image` buffer, keeping the capture timestamp
    pub fn from_rgb_image(image: image::RgbImage, captured_at: Instant) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Arc::from(image.into_raw()),
            captured_at,
        }
    }

    /// Apply a fixed orientation correction
    ///
    /// `None` and unusable frames are returned unchanged (sharing the buffer).
    pub fn rotated(&self, rotation: SensorRotation) -> Frame {
        if rotation == SensorRotation::None {
            return self.clone();
        }
        let Some(image) = self.to_rgb_image() else {
            return self.clone();
        };
        let rotated = match rotation {
            SensorRotation::Rotate90 => image::imageops::rotate90(&image),
            SensorRotation::Rotate180 => image::imageops::rotate180(&image),
            SensorRotation::Rotate270 => image::imageops::rotate270(&image),
            SensorRotation::None => image,
        };
        Frame::from_rgb_image(rotated, self.captured_at)
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// The device could not be opened
    OpenFailed(String),
    /// Format not supported
    FormatNotSupported(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::OpenFailed(msg) => write!(f, "Open failed: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
