// SPDX-License-Identifier: MPL-2.0

//! Recording state machine
//!
//! ```text
//! Idle ──start──▶ Recording ──pause──▶ Paused
//!  ▲                 │   ◀──resume───    │
//!  └──────stop───────┴───────stop────────┘
//! ```
//!
//! At most one session is open at a time. The output stream is opened at a
//! fixed frame rate; no adaptation to the real tick rate is performed.

use super::sink::{VideoSink, VideoSinkFactory};
use crate::backends::camera::types::{Frame, Framerate};
use crate::errors::CameraError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    Paused,
}

/// One open output stream
struct RecordingSession {
    path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
    sink: Box<dyn VideoSink>,
}

/// Summary of a session closed by `stop`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedRecording {
    pub path: PathBuf,
    pub frames: u64,
}

/// Owns the optional recording session and its state
pub struct Recorder {
    factory: Box<dyn VideoSinkFactory>,
    framerate: Framerate,
    pause_supported: bool,
    state: RecorderState,
    session: Option<RecordingSession>,
}

impl Recorder {
    pub fn new(
        factory: Box<dyn VideoSinkFactory>,
        framerate: Framerate,
        pause_supported: bool,
    ) -> Self {
        Self {
            factory,
            framerate,
            pause_supported,
            state: RecorderState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// True while a session is open (recording or paused)
    pub fn is_active(&self) -> bool {
        self.state != RecorderState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.state == RecorderState::Paused
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    pub fn frames_written(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.frames_written)
    }

    /// Open a new session sized `width`x`height`
    ///
    /// The caller passes the dimensions of the rotated frames it will append.
    pub fn start(&mut self, path: &Path, width: u32, height: u32) -> Result<(), CameraError> {
        if self.state != RecorderState::Idle {
            return Err(CameraError::AlreadyRecording);
        }

        let sink = self
            .factory
            .open(path, width, height, self.framerate)
            .map_err(|e| {
                warn!(path = %path.display(), error = %e, "Failed to open video output");
                CameraError::WriteFailure(e)
            })?;

        info!(
            path = %path.display(),
            width,
            height,
            framerate = %self.framerate,
            "Recording started"
        );

        self.session = Some(RecordingSession {
            path: path.to_path_buf(),
            width,
            height,
            frames_written: 0,
            sink,
        });
        self.state = RecorderState::Recording;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), CameraError> {
        match self.state {
            RecorderState::Idle => Err(CameraError::NotRecording),
            _ if !self.pause_supported => Err(CameraError::PauseUnsupported),
            RecorderState::Paused => Ok(()),
            RecorderState::Recording => {
                debug!(frames = self.frames_written(), "Recording paused");
                self.state = RecorderState::Paused;
                Ok(())
            }
        }
    }

    pub fn resume(&mut self) -> Result<(), CameraError> {
        match self.state {
            RecorderState::Idle => Err(CameraError::NotRecording),
            _ if !self.pause_supported => Err(CameraError::PauseUnsupported),
            RecorderState::Recording => Ok(()),
            RecorderState::Paused => {
                debug!(frames = self.frames_written(), "Recording resumed");
                self.state = RecorderState::Recording;
                Ok(())
            }
        }
    }

    /// Append a frame if recording and not paused
    ///
    /// Returns whether the frame was written. A failed write abandons the
    /// session: the sink is dropped and the recorder returns to Idle.
    pub fn write(&mut self, frame: &Frame) -> Result<bool, CameraError> {
        if self.state != RecorderState::Recording {
            return Ok(false);
        }
        let Some(session) = self.session.as_mut() else {
            self.state = RecorderState::Idle;
            return Ok(false);
        };

        let result = if frame.dimensions() != (session.width, session.height) {
            Err(format!(
                "frame {}x{} does not match recording {}x{}",
                frame.width, frame.height, session.width, session.height
            ))
        } else {
            session.sink.write_frame(frame)
        };

        match result {
            Ok(()) => {
                session.frames_written += 1;
                Ok(true)
            }
            Err(e) => {
                warn!(path = %session.path.display(), error = %e, "Recording abandoned");
                self.abandon();
                Err(CameraError::WriteFailure(e))
            }
        }
    }

    /// Flush and close the session
    ///
    /// A no-op returning `Ok(None)` when Idle. The recorder is Idle afterwards
    /// even if finalizing the file failed.
    pub fn stop(&mut self) -> Result<Option<FinishedRecording>, CameraError> {
        self.state = RecorderState::Idle;
        let Some(session) = self.session.take() else {
            return Ok(None);
        };

        let frames = session.frames_written;
        let path = session.sink.finish().map_err(|e| {
            warn!(path = %session.path.display(), error = %e, "Failed to finalize recording");
            CameraError::WriteFailure(e)
        })?;

        info!(path = %path.display(), frames, "Recording stopped");
        Ok(Some(FinishedRecording { path, frames }))
    }

    fn abandon(&mut self) {
        self.session = None;
        self.state = RecorderState::Idle;
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("state", &self.state)
            .field("framerate", &self.framerate)
            .field("pause_supported", &self.pause_supported)
            .field("path", &self.current_path())
            .finish()
    }
}
