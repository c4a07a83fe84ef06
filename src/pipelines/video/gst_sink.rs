// SPDX-License-Identifier: MPL-2.0

//! GStreamer MP4 writer fed from an appsrc
//!
//! ```text
//! appsrc (RGB, fixed rate) ! videoconvert ! <h264 encoder> ! h264parse ! mp4mux ! filesink
//! ```
//!
//! Timestamps come from the frame counter and the configured frame rate, not
//! from the wall clock, so the file plays back at the target rate regardless
//! of how often frames were actually delivered.

use super::sink::{SinkResult, VideoSink, VideoSinkFactory};
use crate::backends::camera::types::{Frame, Framerate};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Software H.264 encoders in order of preference
const H264_ENCODERS: [&str; 2] = ["x264enc", "openh264enc"];

/// Upper bound for the muxer to finalize the file after EOS
const FINALIZE_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates MP4 writers backed by GStreamer
#[derive(Debug, Clone, Default)]
pub struct GstVideoSinkFactory;

impl GstVideoSinkFactory {
    pub fn new() -> SinkResult<Self> {
        gst::init().map_err(|e| format!("Failed to initialize GStreamer: {}", e))?;
        Ok(Self)
    }
}

/// First installed H.264 encoder
pub fn select_encoder() -> SinkResult<gst::Element> {
    for name in H264_ENCODERS {
        if gst::ElementFactory::find(name).is_none() {
            debug!(encoder = name, "Encoder not installed");
            continue;
        }
        let encoder = gst::ElementFactory::make(name)
            .build()
            .map_err(|e| format!("Failed to create {}: {}", name, e))?;
        if name == "x264enc" {
            // Realtime-friendly settings for a live capture feed
            encoder.set_property_from_str("tune", "zerolatency");
            encoder.set_property_from_str("speed-preset", "veryfast");
        }
        info!(encoder = name, "Selected video encoder");
        return Ok(encoder);
    }
    Err("No H.264 encoder available. Please install x264enc or openh264enc".to_string())
}

impl VideoSinkFactory for GstVideoSinkFactory {
    fn open(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
        framerate: Framerate,
    ) -> SinkResult<Box<dyn VideoSink>> {
        info!(
            path = %path.display(),
            width,
            height,
            %framerate,
            "Opening video writer"
        );

        let location = path
            .to_str()
            .ok_or_else(|| format!("Output path is not valid UTF-8: {}", path.display()))?;

        let make = |factory: &str| {
            gst::ElementFactory::make(factory)
                .build()
                .map_err(|e| format!("Failed to create {}: {}", factory, e))
        };

        let appsrc = make("appsrc")?
            .downcast::<AppSrc>()
            .map_err(|_| "Failed to downcast to AppSrc".to_string())?;
        let videoconvert = make("videoconvert")?;
        let encoder = select_encoder()?;
        let parser = make("h264parse")?;
        let muxer = make("mp4mux")?;
        let filesink = gst::ElementFactory::make("filesink")
            .property("location", location)
            .build()
            .map_err(|e| format!("Failed to create filesink: {}", e))?;

        let caps = gst::Caps::builder("video/x-raw")
            .field("format", "RGB")
            .field("width", width as i32)
            .field("height", height as i32)
            .field(
                "framerate",
                gst::Fraction::new(framerate.num as i32, framerate.denom as i32),
            )
            .build();
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);
        appsrc.set_is_live(false);

        let pipeline = gst::Pipeline::new();
        let elements = [
            appsrc.upcast_ref::<gst::Element>(),
            &videoconvert,
            &encoder,
            &parser,
            &muxer,
            &filesink,
        ];
        pipeline
            .add_many(elements)
            .map_err(|e| format!("Failed to add elements to pipeline: {}", e))?;
        gst::Element::link_many(elements)
            .map_err(|e| format!("Failed to link recording pipeline: {}", e))?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| format!("Failed to start recording pipeline: {}", e))?;

        Ok(Box::new(GstVideoSink {
            pipeline,
            appsrc,
            path: path.to_path_buf(),
            width,
            height,
            frame_duration_ns: framerate.frame_duration_ns(),
            frames: 0,
        }))
    }
}

/// Open MP4 writer
struct GstVideoSink {
    pipeline: gst::Pipeline,
    appsrc: AppSrc,
    path: PathBuf,
    width: u32,
    height: u32,
    frame_duration_ns: u64,
    frames: u64,
}

impl GstVideoSink {
    fn bus_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => Some(err.error().to_string()),
            _ => None,
        }
    }
}

impl VideoSink for GstVideoSink {
    fn write_frame(&mut self, frame: &Frame) -> SinkResult<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(format!(
                "Frame size {}x{} doesn't match stream {}x{}",
                frame.width, frame.height, self.width, self.height
            ));
        }
        if let Some(err) = self.bus_error() {
            return Err(err);
        }

        let mut buffer = gst::Buffer::from_slice(frame.data.to_vec());
        {
            let buffer = buffer
                .get_mut()
                .ok_or_else(|| "Failed to get mutable buffer reference".to_string())?;
            buffer.set_pts(gst::ClockTime::from_nseconds(
                self.frame_duration_ns * self.frames,
            ));
            buffer.set_duration(gst::ClockTime::from_nseconds(self.frame_duration_ns));
        }

        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| format!("Failed to push frame: {:?}", e))?;
        self.frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> SinkResult<PathBuf> {
        debug!(frames = self.frames, "Finalizing video file");

        self.appsrc
            .end_of_stream()
            .map_err(|e| format!("Failed to send EOS: {:?}", e))?;

        let mut result = Ok(());
        if let Some(bus) = self.pipeline.bus() {
            let timeout = gst::ClockTime::from_mseconds(FINALIZE_TIMEOUT.as_millis() as u64);
            match bus.timed_pop_filtered(timeout, &[gst::MessageType::Eos, gst::MessageType::Error])
            {
                Some(msg) => {
                    if let gst::MessageView::Error(err) = msg.view() {
                        result = Err(format!("Muxer error: {}", err.error()));
                    }
                }
                None => {
                    warn!("Timed out waiting for the muxer to finalize");
                    result = Err("Timed out finalizing video file".to_string());
                }
            }
        }

        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!(?e, "Failed to set recording pipeline to Null");
        }

        result?;
        info!(path = %self.path.display(), frames = self.frames, "Video file finalized");
        Ok(self.path.clone())
    }
}

impl Drop for GstVideoSink {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}
