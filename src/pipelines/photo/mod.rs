// SPDX-License-Identifier: MPL-2.0

//! Photo pipeline
//!
//! ```text
//! clean frame slot → PhotoCapture → PhotoEncoder (JPEG/PNG) → {dir}/{prefix}_Foto_{HHMMSS}.jpg
//! ```

pub mod capture;
pub mod encoding;

pub use capture::PhotoCapture;
pub use encoding::{EncodingFormat, PhotoEncoder};
