// SPDX-License-Identifier: MPL-2.0

//! Video recording pipeline
//!
//! The recorder receives clean frames from the frame pump and appends them to
//! an output stream opened through a [`VideoSinkFactory`]. The GStreamer
//! factory writes H.264 in MP4.

pub mod gst_sink;
pub mod recorder;
pub mod sink;

pub use gst_sink::GstVideoSinkFactory;
pub use recorder::{FinishedRecording, Recorder, RecorderState};
pub use sink::{SinkResult, VideoSink, VideoSinkFactory};
