// SPDX-License-Identifier: MPL-2.0

//! Error types for the capture engine and its shells

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture engine errors
    Camera(CameraError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Capture engine errors
///
/// None of these are fatal: the engine is left Idle or in its previous
/// state, and the user may retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Every probe candidate failed; holds one diagnostic line per candidate
    NoDeviceFound { diagnostics: Vec<String> },
    /// Photo or recording requested before a frame was cached
    NotReady,
    /// Recording start or lens switch while a recording is open
    AlreadyRecording,
    /// Pause or resume without an open recording
    NotRecording,
    /// The platform cannot truly pause a recording
    PauseUnsupported,
    /// Output could not be opened or written; the session was abandoned
    WriteFailure(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoDeviceFound { diagnostics } => {
                write!(f, "No camera device found")?;
                if !diagnostics.is_empty() {
                    write!(f, " ({})", diagnostics.join("; "))?;
                }
                Ok(())
            }
            CameraError::NotReady => write!(f, "Camera not ready"),
            CameraError::AlreadyRecording => write!(f, "Recording already in progress"),
            CameraError::NotRecording => write!(f, "No recording in progress"),
            CameraError::PauseUnsupported => write!(f, "Pause not available on this device"),
            CameraError::WriteFailure(msg) => write!(f, "Write failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<crate::backends::camera::types::BackendError> for AppError {
    fn from(err: crate::backends::camera::types::BackendError) -> Self {
        AppError::Other(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::WriteFailure(err.to_string())
    }
}

impl From<image::ImageError> for CameraError {
    fn from(err: image::ImageError) -> Self {
        CameraError::WriteFailure(err.to_string())
    }
}
