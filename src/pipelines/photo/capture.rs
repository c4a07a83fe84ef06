// SPDX-License-Identifier: MPL-2.0

//! Photo capture from the clean frame slot
//!
//! Photos are always written from the full-resolution clean frame, never from
//! the downscaled preview.

use super::encoding::PhotoEncoder;
use crate::backends::camera::types::Frame;
use crate::errors::CameraError;
use crate::storage::{CaptureKind, CaptureTarget};
use std::path::PathBuf;
use tracing::info;

/// Photo capture handler
#[derive(Debug, Clone, Default)]
pub struct PhotoCapture {
    encoder: PhotoEncoder,
}

impl PhotoCapture {
    pub fn new(encoder: PhotoEncoder) -> Self {
        Self { encoder }
    }

    /// Write the cached frame into `target` using `prefix`
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Path of the written image
    /// * `Err(CameraError::NotReady)` - No frame cached yet
    /// * `Err(CameraError::WriteFailure)` - Directory or file could not be written
    pub fn capture(
        &self,
        frame: Option<&Frame>,
        target: &CaptureTarget,
        prefix: &str,
    ) -> Result<PathBuf, CameraError> {
        let frame = frame.ok_or(CameraError::NotReady)?;

        let path = target.prepare(prefix, CaptureKind::Photo, self.encoder.format().extension())?;
        self.encoder.write(frame, &path)?;

        info!(
            path = %path.display(),
            width = frame.width,
            height = frame.height,
            "Photo saved"
        );
        Ok(path)
    }
}
