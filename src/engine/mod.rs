// SPDX-License-Identifier: GPL-3.0-only

//! Camera capture engine
//!
//! Owns the open device, the tick schedule, the clean frame slot, the
//! recorder and the capture counter. Everything runs on the caller's thread:
//!
//! ```text
//! start() ──▶ DeviceProber ──▶ TickSchedule armed
//!                                   │
//!            poll(now) ─────────────┤ due?
//!                                   ▼
//!   read ─▶ rotate ─▶ clean frame ─┬─▶ Recorder (when Recording)
//!                                  └─▶ preview::render
//! ```
//!
//! Every failed operation is written to the status as `Error: ...` and
//! leaves the engine in a consistent state.

pub mod lens;
pub mod schedule;
pub mod status;

pub use lens::Lens;
pub use schedule::TickSchedule;
pub use status::{StatusBoard, StatusListener};

use crate::backends::camera::types::{Frame, ProbeCandidate, SensorRotation};
use crate::backends::camera::{CameraDriver, DeviceHandle, DeviceProber, GstCameraDriver};
use crate::config::Config;
use crate::constants::status as messages;
use crate::errors::{AppError, AppResult, CameraError};
use crate::pipelines::photo::{PhotoCapture, PhotoEncoder};
use crate::pipelines::preview::{self, PreviewBuffer};
use crate::pipelines::video::{
    FinishedRecording, GstVideoSinkFactory, Recorder, RecorderState, VideoSinkFactory,
};
use crate::storage::{CaptureKind, CaptureTarget, EXTINGUISHER_PREFIX};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const VIDEO_EXTENSION: &str = "mp4";

/// What one tick of the frame pump did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The pump is not scheduled
    Idle,
    /// The device read failed or returned an unusable frame
    Skipped,
    /// A frame was stored; `recorded` tells whether it went into the recording
    Frame { recorded: bool },
}

/// Result of [`CaptureEngine::toggle_record_stop`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordToggle {
    Started(PathBuf),
    Stopped(Option<FinishedRecording>),
}

/// The capture engine
pub struct CaptureEngine {
    driver: Box<dyn CameraDriver>,
    prober: DeviceProber,
    device: Option<DeviceHandle>,
    schedule: TickSchedule,
    rotation: SensorRotation,
    preview_height: u32,
    status_flash: Duration,
    clean_frame: Option<Frame>,
    preview: Option<PreviewBuffer>,
    recorder: Recorder,
    photos: PhotoCapture,
    target: CaptureTarget,
    lens: Lens,
    capture_count: u64,
    status: StatusBoard,
}

impl CaptureEngine {
    pub fn new(
        config: &Config,
        driver: Box<dyn CameraDriver>,
        sinks: Box<dyn VideoSinkFactory>,
    ) -> Self {
        Self {
            driver,
            prober: DeviceProber::new(config.candidates.clone(), config.probe_resolution),
            device: None,
            schedule: TickSchedule::new(config.tick_interval()),
            rotation: config.rotation,
            preview_height: config.preview_height,
            status_flash: config.status_flash(),
            clean_frame: None,
            preview: None,
            recorder: Recorder::new(sinks, config.recording_framerate(), config.pause_supported),
            photos: PhotoCapture::new(PhotoEncoder::new(config.photo_format, config.jpeg_quality)),
            target: CaptureTarget::for_measurement(&config.output_dir, config.measurement_type),
            lens: Lens::default(),
            capture_count: 0,
            status: StatusBoard::new(messages::READY),
        }
    }

    /// Engine backed by the GStreamer camera driver and video sink
    pub fn with_gstreamer(config: &Config) -> AppResult<Self> {
        let driver = GstCameraDriver::new(config.read_timeout())?;
        let sinks = GstVideoSinkFactory::new().map_err(AppError::Other)?;
        Ok(Self::new(config, Box::new(driver), Box::new(sinks)))
    }

    // Lifecycle

    /// Probe for a device and arm the frame pump
    ///
    /// A no-op when a device is already open.
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.device.is_some() {
            debug!("Engine already started");
            return Ok(());
        }
        let prober = self.prober.clone();
        self.open_with(&prober)?;
        self.lens = Lens::default();
        self.status.set(messages::READY);
        Ok(())
    }

    /// Stop the camera
    ///
    /// Unschedules the tick, closes any recording (flushing it first) and
    /// releases the device, in that order. Safe to call repeatedly.
    pub fn stop(&mut self) -> Result<(), CameraError> {
        let was_running = self.device.is_some() || self.recorder.is_active();
        let result = self.stop_camera();
        if was_running && result.is_ok() {
            self.status.set(messages::STOPPED);
        }
        result
    }

    /// Stop the camera and reset lens and status, for leaving the capture screen
    pub fn exit(&mut self) -> Result<(), CameraError> {
        let result = self.stop_camera();
        self.lens = Lens::default();
        if result.is_ok() {
            self.status.set(messages::READY);
        }
        info!(captures = self.capture_count, "Capture engine exited");
        result
    }

    /// Release the current device and run the full probe again
    pub fn reprobe(&mut self) -> Result<(), CameraError> {
        self.stop_camera()?;
        self.start()
    }

    /// Switch to another lens by re-probing its device indices
    ///
    /// Falls back to the main lens when none of the lens's indices yields a
    /// usable frame. Refused while a recording is open.
    pub fn select_lens(&mut self, lens: Lens) -> Result<Lens, CameraError> {
        if self.recorder.is_active() {
            return Err(self.report(CameraError::AlreadyRecording));
        }
        self.stop_camera()?;

        let table = self.prober.candidates();
        let preferred = self.prober.with_candidates(lens.candidates(table));
        let fallback = self.prober.with_candidates(lens.fallback_candidates(table));

        let first = match self.open_quietly(&preferred) {
            Ok(()) => {
                self.lens = lens;
                let index = self.device.as_ref().map_or(0, DeviceHandle::index);
                info!(%lens, index, "Lens selected");
                self.status.set(format!("{} lens (camera {})", lens, index));
                return Ok(lens);
            }
            Err(e) => e,
        };

        if fallback.candidates().is_empty() {
            return Err(self.report(first));
        }

        warn!(%lens, "Lens unavailable, falling back to main lens");
        match self.open_quietly(&fallback) {
            Ok(()) => {
                self.lens = Lens::Main;
                self.status
                    .flash(messages::LENS_UNAVAILABLE, self.status_flash, Instant::now());
                Ok(Lens::Main)
            }
            Err(second) => Err(self.report(merge_diagnostics(first, second))),
        }
    }

    /// Cycle Main → Wide → Front → Main
    pub fn cycle_lens(&mut self) -> Result<Lens, CameraError> {
        self.select_lens(self.lens.next())
    }

    /// Change where captures go and how they are named
    pub fn set_target(&mut self, target: CaptureTarget) {
        debug!(dir = %target.dir.display(), prefix = %target.prefix, "Capture target changed");
        self.target = target;
    }

    // Frame pump

    /// Run the frame pump if a tick is due at `now`
    ///
    /// Also clears transient statuses whose time is up.
    pub fn poll(&mut self, now: Instant) -> Option<TickOutcome> {
        self.status.expire(now);
        if self.schedule.take_due(now) {
            Some(self.pump())
        } else {
            None
        }
    }

    /// Run one tick of the frame pump immediately
    pub fn tick(&mut self) -> TickOutcome {
        self.status.expire(Instant::now());
        self.pump()
    }

    fn pump(&mut self) -> TickOutcome {
        if !self.schedule.is_scheduled() {
            return TickOutcome::Idle;
        }
        let Some(device) = self.device.as_mut() else {
            return TickOutcome::Idle;
        };

        let raw = match device.read() {
            Some(frame) if frame.is_usable() => frame,
            _ => return TickOutcome::Skipped,
        };
        let frame = raw.rotated(self.rotation);

        let recorded = match self.recorder.write(&frame) {
            Ok(written) => written,
            Err(e) => {
                self.report(e);
                false
            }
        };

        self.preview = preview::render(&frame, self.preview_height);
        self.clean_frame = Some(frame);
        TickOutcome::Frame { recorded }
    }

    // Captures

    /// Save the clean frame as a photo using the target's prefix
    pub fn take_photo(&mut self) -> Result<PathBuf, CameraError> {
        let prefix = self.target.prefix.clone();
        self.take_labelled_photo(&prefix)
    }

    /// Save the clean frame as an extinguisher photo
    pub fn take_extinguisher_photo(&mut self) -> Result<PathBuf, CameraError> {
        self.take_labelled_photo(EXTINGUISHER_PREFIX)
    }

    /// Save the clean frame as a photo named with `prefix`
    pub fn take_labelled_photo(&mut self, prefix: &str) -> Result<PathBuf, CameraError> {
        match self
            .photos
            .capture(self.clean_frame.as_ref(), &self.target, prefix)
        {
            Ok(path) => {
                self.capture_count += 1;
                self.status
                    .flash(messages::PHOTO_SAVED, self.status_flash, Instant::now());
                Ok(path)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Start a recording, or stop the open one
    pub fn toggle_record_stop(&mut self) -> Result<RecordToggle, CameraError> {
        if self.recorder.is_active() {
            let finished = self.finish_recording().map_err(|e| self.report(e))?;
            self.status.set(messages::READY);
            return Ok(RecordToggle::Stopped(finished));
        }
        self.start_recording()
            .map(RecordToggle::Started)
            .map_err(|e| self.report(e))
    }

    fn start_recording(&mut self) -> Result<PathBuf, CameraError> {
        // Clean frames are already rotated, so their size is the output size.
        let (width, height) = self
            .clean_frame
            .as_ref()
            .map(Frame::dimensions)
            .ok_or(CameraError::NotReady)?;
        if self.device.is_none() {
            return Err(CameraError::NotReady);
        }

        let prefix = self.target.prefix.clone();
        let path = self
            .target
            .prepare(&prefix, CaptureKind::Video, VIDEO_EXTENSION)?;
        self.recorder.start(&path, width, height)?;
        self.status.set(messages::RECORDING);
        Ok(path)
    }

    /// Pause or resume the open recording
    pub fn toggle_pause(&mut self) -> Result<RecorderState, CameraError> {
        let result = match self.recorder.state() {
            RecorderState::Idle => Err(CameraError::NotRecording),
            RecorderState::Recording => self.recorder.pause(),
            RecorderState::Paused => self.recorder.resume(),
        };
        if let Err(e) = result {
            return Err(self.report(e));
        }

        let state = self.recorder.state();
        self.status.set(match state {
            RecorderState::Paused => messages::PAUSED,
            _ => messages::RECORDING,
        });
        Ok(state)
    }

    // Accessors

    pub fn capture_count(&self) -> u64 {
        self.capture_count
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.recorder.is_paused()
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.recorder.state()
    }

    /// Frames appended to the open recording
    pub fn frames_recorded(&self) -> u64 {
        self.recorder.frames_written()
    }

    /// True while the frame pump is scheduled
    pub fn is_running(&self) -> bool {
        self.schedule.is_scheduled()
    }

    pub fn status(&self) -> &str {
        self.status.message()
    }

    pub fn status_revision(&self) -> u64 {
        self.status.revision()
    }

    pub fn set_status_listener(&mut self, listener: StatusListener) {
        self.status.set_listener(listener);
    }

    pub fn preview(&self) -> Option<&PreviewBuffer> {
        self.preview.as_ref()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.clean_frame.as_ref()
    }

    pub fn device(&self) -> Option<&DeviceHandle> {
        self.device.as_ref()
    }

    pub fn lens(&self) -> Lens {
        self.lens
    }

    pub fn target(&self) -> &CaptureTarget {
        &self.target
    }

    pub fn candidates(&self) -> &[ProbeCandidate] {
        self.prober.candidates()
    }

    /// Time until the next tick, `None` while stopped
    pub fn time_until_tick(&self, now: Instant) -> Option<Duration> {
        self.schedule.time_until_due(now)
    }

    // Internals

    fn open_with(&mut self, prober: &DeviceProber) -> Result<(), CameraError> {
        self.status.set(messages::SEARCHING);
        self.open_quietly(prober).map_err(|e| self.report(e))
    }

    fn open_quietly(&mut self, prober: &DeviceProber) -> Result<(), CameraError> {
        let handle = prober.probe(self.driver.as_mut())?;
        self.device = Some(handle);
        self.schedule.schedule(Instant::now());
        Ok(())
    }

    fn stop_camera(&mut self) -> Result<(), CameraError> {
        self.schedule.cancel();

        let closed = self.finish_recording();

        if let Some(handle) = self.device.take() {
            handle.release();
        }
        self.clean_frame = None;
        self.preview = None;

        closed.map(|_| ()).map_err(|e| self.report(e))
    }

    fn finish_recording(&mut self) -> Result<Option<FinishedRecording>, CameraError> {
        let finished = self.recorder.stop()?;
        if finished.is_some() {
            self.capture_count += 1;
        }
        Ok(finished)
    }

    fn report(&mut self, error: CameraError) -> CameraError {
        warn!(error = %error, "Capture engine error");
        self.status.set(format!("Error: {}", error));
        error
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        if self.device.is_some() || self.recorder.is_active() {
            let _ = self.stop_camera();
        }
    }
}

impl std::fmt::Debug for CaptureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureEngine")
            .field("device", &self.device)
            .field("running", &self.schedule.is_scheduled())
            .field("recorder", &self.recorder)
            .field("lens", &self.lens)
            .field("capture_count", &self.capture_count)
            .field("status", &self.status.message())
            .finish()
    }
}

fn merge_diagnostics(first: CameraError, second: CameraError) -> CameraError {
    match (first, second) {
        (
            CameraError::NoDeviceFound { diagnostics: mut a },
            CameraError::NoDeviceFound { diagnostics: b },
        ) => {
            a.extend(b);
            CameraError::NoDeviceFound { diagnostics: a }
        }
        (_, second) => second,
    }
}
