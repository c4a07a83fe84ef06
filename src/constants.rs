// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Number of device indices in the default probe table
pub const PROBE_INDEX_COUNT: u32 = 5;

/// Base resolution requested while probing; every sensor supports it
pub const PROBE_BASE_WIDTH: u32 = 640;
pub const PROBE_BASE_HEIGHT: u32 = 480;

/// Frame pump tick rate
pub const DEFAULT_TICK_RATE_HZ: u32 = 30;

/// Frame rate written into recordings
pub const DEFAULT_RECORDING_FPS: u32 = 30;

/// Height of the preview texture
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 480;

/// JPEG quality for photos
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// How long transient statuses such as "Photo saved" stay visible
pub const DEFAULT_STATUS_FLASH: Duration = Duration::from_secs(2);

/// Upper bound for one device read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Status strings shown by the shells
pub mod status {
    pub const READY: &str = "";
    pub const SEARCHING: &str = "Searching for camera...";
    pub const STOPPED: &str = "Camera paused";
    pub const RECORDING: &str = "Recording";
    pub const PAUSED: &str = "Recording paused";
    pub const PHOTO_SAVED: &str = "Photo saved!";
    pub const LENS_UNAVAILABLE: &str = "Lens not available";
}
