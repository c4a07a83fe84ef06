// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! - [`camera`]: Driver seam, device probing and the GStreamer implementation

pub mod camera;
