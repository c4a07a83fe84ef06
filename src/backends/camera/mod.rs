// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │   Capture Engine    │
//! └──────────┬──────────┘
//!            │ probe()
//!            ▼
//! ┌─────────────────────┐
//! │    DeviceProber     │  ← ordered (index, backend) candidates
//! └──────────┬──────────┘
//!            │ open() / read()
//!            ▼
//! ┌─────────────────────┐
//! │ CameraDriver trait  │  ← common interface
//! └──────────┬──────────┘
//!            ▼
//!      ┌───────────┐
//!      │ GStreamer │  ← autovideosrc / pipewiresrc / v4l2src
//!      └───────────┘
//! ```

pub mod gst_source;
pub mod prober;
pub mod types;

pub use gst_source::GstCameraDriver;
pub use prober::DeviceProber;
pub use types::*;

use chrono::{DateTime, Local};
use tracing::debug;

/// Opens camera devices for probe candidates
pub trait CameraDriver {
    /// Try to open the device described by `candidate`
    ///
    /// When `base_resolution` is set the driver should request it, which keeps
    /// picky backends on a mode every sensor supports.
    fn open(
        &mut self,
        candidate: &ProbeCandidate,
        base_resolution: Option<Resolution>,
    ) -> BackendResult<Box<dyn CaptureDevice>>;
}

/// An open camera stream
///
/// Dropping the device releases the native handle.
pub trait CaptureDevice {
    /// Pull one frame; `None` when the read failed
    fn read(&mut self) -> Option<Frame>;

    /// Short human-readable description for logs and status
    fn describe(&self) -> String;
}

/// Exclusively owned reference to the open camera stream
pub struct DeviceHandle {
    candidate: ProbeCandidate,
    opened_at: DateTime<Local>,
    device: Box<dyn CaptureDevice>,
}

impl DeviceHandle {
    pub fn new(candidate: ProbeCandidate, device: Box<dyn CaptureDevice>) -> Self {
        Self {
            candidate,
            opened_at: Local::now(),
            device,
        }
    }

    pub fn candidate(&self) -> ProbeCandidate {
        self.candidate
    }

    pub fn index(&self) -> u32 {
        self.candidate.index
    }

    pub fn backend(&self) -> BackendHint {
        self.candidate.backend
    }

    pub fn opened_at(&self) -> DateTime<Local> {
        self.opened_at
    }

    pub fn read(&mut self) -> Option<Frame> {
        self.device.read()
    }

    pub fn describe(&self) -> String {
        self.device.describe()
    }

    /// Release the device
    pub fn release(self) {
        debug!(candidate = %self.candidate, "Releasing camera device");
        drop(self);
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("candidate", &self.candidate)
            .field("opened_at", &self.opened_at)
            .field("device", &self.device.describe())
            .finish()
    }
}
