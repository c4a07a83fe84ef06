// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! Encodes clean frames to JPEG (with quality control) or PNG.

use crate::backends::camera::types::Frame;
use crate::errors::CameraError;
use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Supported photo formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    #[default]
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }
}

/// Photo encoder
#[derive(Debug, Clone)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    jpeg_quality: u8,
}

impl PhotoEncoder {
    pub fn new(format: EncodingFormat, jpeg_quality: u8) -> Self {
        Self {
            format,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    /// Encode `frame` into `path`
    pub fn write(&self, frame: &Frame, path: &Path) -> Result<(), CameraError> {
        if !frame.is_usable() {
            return Err(CameraError::WriteFailure(format!(
                "frame {}x{} has an incomplete buffer",
                frame.width, frame.height
            )));
        }

        let file = File::create(path)?;
        if let Err(e) = self.encode(frame, BufWriter::new(file)) {
            // Leave no truncated file behind
            if let Err(remove_err) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %remove_err, "Failed to remove partial photo");
            }
            return Err(e);
        }

        debug!(
            path = %path.display(),
            format = ?self.format,
            width = frame.width,
            height = frame.height,
            "Photo encoded"
        );
        Ok(())
    }

    fn encode(&self, frame: &Frame, mut writer: BufWriter<File>) -> Result<(), CameraError> {
        match self.format {
            EncodingFormat::Jpeg => {
                JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality).write_image(
                    &frame.data,
                    frame.width,
                    frame.height,
                    image::ExtendedColorType::Rgb8,
                )?;
            }
            EncodingFormat::Png => {
                PngEncoder::new(&mut writer).write_image(
                    &frame.data,
                    frame.width,
                    frame.height,
                    image::ExtendedColorType::Rgb8,
                )?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new(EncodingFormat::Jpeg, 92)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(PhotoEncoder::new(EncodingFormat::Jpeg, 0).jpeg_quality, 1);
        assert_eq!(PhotoEncoder::new(EncodingFormat::Jpeg, 200).jpeg_quality, 100);
    }

    #[test]
    fn test_png_round_trips_dimensions() {
        let dir = std::env::temp_dir().join(format!("survey-camera-enc-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frame.png");

        let frame = Frame::new(3, 2, vec![200u8; 18]);
        PhotoEncoder::new(EncodingFormat::Png, 90)
            .write(&frame, &path)
            .unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rejects_incomplete_frame() {
        let frame = Frame::new(3, 2, vec![0u8; 4]);
        let err = PhotoEncoder::default()
            .write(&frame, Path::new("/nonexistent/never-written.jpg"))
            .unwrap_err();
        assert!(matches!(err, CameraError::WriteFailure(_)));
    }

    #[test]
    fn test_failed_encode_removes_partial_file() {
        let dir = std::env::temp_dir().join(format!("survey-camera-enc-fail-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("too_wide.jpg");

        // JPEG cannot hold more than 65535 columns
        let frame = Frame::new(70_000, 1, vec![0u8; Frame::expected_len(70_000, 1)]);
        let err = PhotoEncoder::default().write(&frame, &path).unwrap_err();

        assert!(matches!(err, CameraError::WriteFailure(_)));
        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
