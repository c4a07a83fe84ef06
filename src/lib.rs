// SPDX-License-Identifier: MPL-2.0

//! Survey Camera - capture engine for field-survey photos and videos
//!
//! Finds a working camera among several device index and backend
//! combinations, pumps frames on a fixed tick, and writes photos and videos
//! named after the survey's measurement type.
//!
//! # Architecture
//!
//! - [`backends`]: Camera driver seam, device probing and the GStreamer driver
//! - [`engine`]: The capture engine, its tick schedule and status board
//! - [`pipelines`]: Photo encoding, video recording and preview rendering
//! - [`config`]: User configuration handling
//! - [`storage`]: Capture naming and output directories
//! - [`terminal`]: Interactive terminal shell
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load();
//! let mut engine = CaptureEngine::with_gstreamer(&config)?;
//! engine.start()?;
//! engine.tick();
//! let path = engine.take_photo()?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use config::Config;
pub use engine::{CaptureEngine, Lens, RecordToggle, TickOutcome};
pub use errors::{AppError, AppResult, CameraError};
pub use storage::{CaptureTarget, MeasurementType};
