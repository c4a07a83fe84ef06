// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer camera driver
//!
//! Every backend hint maps to a different GStreamer source element; the rest
//! of the pipeline is shared and always hands out packed RGB through an
//! appsink:
//!
//! ```text
//! <source> ! videoconvert ! videoscale ! video/x-raw,format=RGB ! appsink
//! ```
//!
//! | hint            | source                                   |
//! |-----------------|------------------------------------------|
//! | default         | n-th `Video/Source` from the device monitor |
//! | platform-native | `pipewiresrc path=v4l2:/dev/videoN`      |
//! | v4l2            | `v4l2src device=/dev/videoN`             |

use super::types::*;
use super::{CameraDriver, CaptureDevice};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Appsink element name inside the capture pipeline
const SINK_NAME: &str = "survey_sink";

/// How long a freshly built pipeline may take to start streaming
const START_TIMEOUT: Duration = Duration::from_secs(3);

/// Camera driver backed by GStreamer source elements
#[derive(Debug, Clone)]
pub struct GstCameraDriver {
    read_timeout: Duration,
}

impl GstCameraDriver {
    /// Create a driver whose reads wait at most `read_timeout` for a frame
    pub fn new(read_timeout: Duration) -> BackendResult<Self> {
        gstreamer::init().map_err(|e| BackendError::NotAvailable(e.to_string()))?;
        Ok(Self { read_timeout })
    }

    fn source_element(&self, candidate: &ProbeCandidate) -> BackendResult<gstreamer::Element> {
        match candidate.backend {
            BackendHint::Default => monitored_source(candidate.index),
            BackendHint::PlatformNative => gstreamer::ElementFactory::make("pipewiresrc")
                .property("path", format!("v4l2:/dev/video{}", candidate.index))
                .build()
                .map_err(|e| BackendError::NotAvailable(format!("pipewiresrc: {}", e))),
            BackendHint::V4l2 => gstreamer::ElementFactory::make("v4l2src")
                .property("device", format!("/dev/video{}", candidate.index))
                .build()
                .map_err(|e| BackendError::NotAvailable(format!("v4l2src: {}", e))),
        }
    }
}

impl CameraDriver for GstCameraDriver {
    fn open(
        &mut self,
        candidate: &ProbeCandidate,
        base_resolution: Option<Resolution>,
    ) -> BackendResult<Box<dyn CaptureDevice>> {
        debug!(%candidate, ?base_resolution, "Opening GStreamer camera source");

        let source = self.source_element(candidate)?;
        let pipeline = build_capture_pipeline(source, base_resolution)?;

        let appsink = pipeline
            .by_name(SINK_NAME)
            .ok_or_else(|| BackendError::OpenFailed("appsink missing".into()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| BackendError::OpenFailed("failed to cast appsink".into()))?;

        // Only the newest frame matters; stale ones are dropped by the sink
        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", 1u32);
        appsink.set_property("drop", true);

        let device = GstCaptureDevice {
            pipeline,
            appsink,
            candidate: *candidate,
            read_timeout: self.read_timeout,
        };
        device.start()?;

        info!(%candidate, "GStreamer camera source started");
        Ok(Box::new(device))
    }
}

/// Pick the n-th video source known to the GStreamer device monitor
fn monitored_source(index: u32) -> BackendResult<gstreamer::Element> {
    let monitor = gstreamer::DeviceMonitor::new();
    monitor.add_filter(Some("Video/Source"), None);
    monitor
        .start()
        .map_err(|e| BackendError::NotAvailable(format!("device monitor: {}", e)))?;
    let devices: Vec<gstreamer::Device> = monitor.devices().into_iter().collect();
    monitor.stop();

    debug!(count = devices.len(), index, "Device monitor listed video sources");

    match devices.get(index as usize) {
        Some(device) => {
            debug!(name = %device.display_name(), "Using monitored video source");
            device
                .create_element(None)
                .map_err(|e| BackendError::OpenFailed(e.to_string()))
        }
        // Some systems expose nothing through the monitor; autovideosrc still works
        None if index == 0 => gstreamer::ElementFactory::make("autovideosrc")
            .build()
            .map_err(|e| BackendError::NotAvailable(format!("autovideosrc: {}", e))),
        None => Err(BackendError::OpenFailed(format!(
            "no video source at index {}",
            index
        ))),
    }
}

fn build_capture_pipeline(
    source: gstreamer::Element,
    base_resolution: Option<Resolution>,
) -> BackendResult<gstreamer::Pipeline> {
    let caps = match base_resolution {
        Some(res) => format!(
            "video/x-raw,format=RGB,width={},height={}",
            res.width, res.height
        ),
        None => "video/x-raw,format=RGB".to_string(),
    };
    let description = format!(
        "videoconvert ! videoscale ! {} ! appsink name={}",
        caps, SINK_NAME
    );

    let tail = gstreamer::parse::bin_from_description(&description, true)
        .map_err(|e| BackendError::OpenFailed(format!("failed to parse pipeline: {}", e)))?;

    let pipeline = gstreamer::Pipeline::new();
    pipeline
        .add_many([&source, tail.upcast_ref()])
        .map_err(|e| BackendError::OpenFailed(format!("failed to add elements: {}", e)))?;
    source
        .link(&tail)
        .map_err(|e| BackendError::FormatNotSupported(format!("failed to link source: {}", e)))?;

    Ok(pipeline)
}

/// Open GStreamer capture pipeline
struct GstCaptureDevice {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    candidate: ProbeCandidate,
    read_timeout: Duration,
}

impl GstCaptureDevice {
    fn start(&self) -> BackendResult<()> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| BackendError::OpenFailed(format!("failed to start pipeline: {}", e)))?;

        let (result, state, _pending) = self
            .pipeline
            .state(gstreamer::ClockTime::from_mseconds(START_TIMEOUT.as_millis() as u64));
        if result.is_err() {
            return Err(BackendError::OpenFailed(format!(
                "pipeline stuck in {:?}",
                state
            )));
        }

        if let Some(bus) = self.pipeline.bus()
            && let Some(msg) = bus.pop_filtered(&[gstreamer::MessageType::Error])
            && let gstreamer::MessageView::Error(err) = msg.view()
        {
            return Err(BackendError::OpenFailed(err.error().to_string()));
        }

        Ok(())
    }
}

impl CaptureDevice for GstCaptureDevice {
    fn read(&mut self) -> Option<Frame> {
        let timeout = gstreamer::ClockTime::from_mseconds(self.read_timeout.as_millis() as u64);
        let sample = self.appsink.try_pull_sample(timeout)?;
        let captured_at = Instant::now();

        let caps = sample.caps()?;
        let info = match VideoInfo::from_caps(caps) {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Sample carried unreadable caps");
                return None;
            }
        };
        let buffer = sample.buffer()?;
        let map = buffer.map_readable().ok()?;

        let width = info.width();
        let height = info.height();
        let stride = info.stride()[0] as usize;
        let row_len = width as usize * Frame::BYTES_PER_PIXEL;
        let data = map.as_slice();

        // Strip row padding so the frame is tightly packed
        let mut packed = Vec::with_capacity(row_len * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let Some(line) = data.get(start..start + row_len) else {
                debug!(row, stride, len = data.len(), "Truncated camera buffer");
                return Some(Frame {
                    width: 0,
                    height: 0,
                    data: Vec::<u8>::new().into(),
                    captured_at,
                });
            };
            packed.extend_from_slice(line);
        }

        Some(Frame {
            width,
            height,
            data: packed.into(),
            captured_at,
        })
    }

    fn describe(&self) -> String {
        format!("GStreamer {}", self.candidate)
    }
}

impl Drop for GstCaptureDevice {
    fn drop(&mut self) {
        debug!(candidate = %self.candidate, "Stopping GStreamer camera source");
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!(?e, "Failed to set capture pipeline to Null on drop");
        }
    }
}
