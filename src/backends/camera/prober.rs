// SPDX-License-Identifier: GPL-3.0-only

//! Device discovery over an ordered candidate table
//!
//! Candidates are tried strictly in table order. A candidate is accepted only
//! when it opens *and* its first read returns a usable frame; opening alone is
//! not enough because some backends report success and then deliver empty
//! buffers. Rejected devices are dropped before the next candidate is opened
//! so at most one handle is held at any time.

use super::types::{ProbeCandidate, Resolution};
use super::{CameraDriver, DeviceHandle};
use crate::errors::CameraError;
use tracing::{debug, info, warn};

/// Ordered fallback chain of probe candidates
#[derive(Debug, Clone)]
pub struct DeviceProber {
    candidates: Vec<ProbeCandidate>,
    base_resolution: Option<Resolution>,
}

impl DeviceProber {
    pub fn new(candidates: Vec<ProbeCandidate>, base_resolution: Option<Resolution>) -> Self {
        Self {
            candidates,
            base_resolution,
        }
    }

    pub fn candidates(&self) -> &[ProbeCandidate] {
        &self.candidates
    }

    /// A prober over a different candidate list with the same settings
    pub fn with_candidates(&self, candidates: Vec<ProbeCandidate>) -> Self {
        Self {
            candidates,
            base_resolution: self.base_resolution,
        }
    }

    /// Run the fallback chain once
    ///
    /// Returns the first accepted device. Failure is terminal; callers must
    /// trigger a new probe explicitly.
    pub fn probe(&self, driver: &mut dyn CameraDriver) -> Result<DeviceHandle, CameraError> {
        info!(
            candidates = self.candidates.len(),
            base_resolution = ?self.base_resolution,
            "Probing camera devices"
        );

        let mut diagnostics = Vec::with_capacity(self.candidates.len());

        for candidate in &self.candidates {
            let mut device = match driver.open(candidate, self.base_resolution) {
                Ok(device) => device,
                Err(e) => {
                    debug!(%candidate, error = %e, "Candidate failed to open");
                    diagnostics.push(format!("{}: {}", candidate, e));
                    continue;
                }
            };

            match device.read() {
                Some(frame) if frame.is_usable() => {
                    info!(
                        %candidate,
                        width = frame.width,
                        height = frame.height,
                        device = %device.describe(),
                        "Camera device accepted"
                    );
                    return Ok(DeviceHandle::new(*candidate, device));
                }
                Some(frame) => {
                    debug!(
                        %candidate,
                        width = frame.width,
                        height = frame.height,
                        bytes = frame.data.len(),
                        "Candidate delivered an empty frame"
                    );
                    diagnostics.push(format!("{}: empty frame", candidate));
                }
                None => {
                    debug!(%candidate, "Candidate opened but the first read failed");
                    diagnostics.push(format!("{}: read failed", candidate));
                }
            }

            drop(device);
        }

        warn!(tried = self.candidates.len(), "No usable camera device found");
        Err(CameraError::NoDeviceFound { diagnostics })
    }
}
