// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture engine using scripted devices and sinks

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use survey_camera::backends::camera::types::{
    BackendError, BackendHint, BackendResult, Frame, Framerate, ProbeCandidate, Resolution,
    SensorRotation,
};
use survey_camera::backends::camera::{CameraDriver, CaptureDevice};
use survey_camera::pipelines::video::{RecorderState, SinkResult, VideoSink, VideoSinkFactory};
use survey_camera::{
    CameraError, CaptureEngine, Config, Lens, MeasurementType, RecordToggle, TickOutcome,
};
use uuid::Uuid;

/// How a scripted device behaves
#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// `open` fails
    FailOpen,
    /// Opens, then hands out zero-sized frames
    EmptyFrames,
    /// Opens and delivers `width`x`height` frames
    Frames(u32, u32),
}

/// Everything the fakes observed, shared with the test body
#[derive(Default)]
struct Log {
    opened: Vec<ProbeCandidate>,
    live_devices: i32,
    failing_reads: u32,
    events: Vec<String>,
    sinks: Vec<(PathBuf, u32, u32, Framerate)>,
    frames_written: Vec<(u32, u32)>,
    finished: Vec<PathBuf>,
    fail_write_at: Option<usize>,
    fail_open: bool,
    fail_finish: bool,
}

type SharedLog = Rc<RefCell<Log>>;
type Script = Rc<RefCell<HashMap<(u32, BackendHint), Behavior>>>;

struct FakeDriver {
    script: Script,
    log: SharedLog,
}

impl CameraDriver for FakeDriver {
    fn open(
        &mut self,
        candidate: &ProbeCandidate,
        _base_resolution: Option<Resolution>,
    ) -> BackendResult<Box<dyn CaptureDevice>> {
        let behavior = self
            .script
            .borrow()
            .get(&(candidate.index, candidate.backend))
            .copied()
            .unwrap_or(Behavior::FailOpen);

        let mut log = self.log.borrow_mut();
        log.opened.push(*candidate);
        match behavior {
            Behavior::FailOpen => Err(BackendError::OpenFailed("no such device".into())),
            Behavior::EmptyFrames => {
                log.live_devices += 1;
                Ok(Box::new(FakeDevice {
                    size: (0, 0),
                    log: Rc::clone(&self.log),
                }))
            }
            Behavior::Frames(w, h) => {
                log.live_devices += 1;
                Ok(Box::new(FakeDevice {
                    size: (w, h),
                    log: Rc::clone(&self.log),
                }))
            }
        }
    }
}

struct FakeDevice {
    size: (u32, u32),
    log: SharedLog,
}

impl CaptureDevice for FakeDevice {
    fn read(&mut self) -> Option<Frame> {
        let mut log = self.log.borrow_mut();
        if log.failing_reads > 0 {
            log.failing_reads -= 1;
            return None;
        }
        let (w, h) = self.size;
        Some(Frame::new(w, h, vec![90u8; Frame::expected_len(w, h)]))
    }

    fn describe(&self) -> String {
        format!("fake {}x{}", self.size.0, self.size.1)
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        let mut log = self.log.borrow_mut();
        log.live_devices -= 1;
        log.events.push("release".into());
    }
}

struct FakeSinks {
    log: SharedLog,
}

impl VideoSinkFactory for FakeSinks {
    fn open(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
        framerate: Framerate,
    ) -> SinkResult<Box<dyn VideoSink>> {
        let mut log = self.log.borrow_mut();
        if log.fail_open {
            return Err("read-only file system".into());
        }
        log.sinks.push((path.to_path_buf(), width, height, framerate));
        Ok(Box::new(FakeSink {
            path: path.to_path_buf(),
            log: Rc::clone(&self.log),
        }))
    }
}

struct FakeSink {
    path: PathBuf,
    log: SharedLog,
}

impl VideoSink for FakeSink {
    fn write_frame(&mut self, frame: &Frame) -> SinkResult<()> {
        let mut log = self.log.borrow_mut();
        if log.fail_write_at == Some(log.frames_written.len()) {
            return Err("disk full".into());
        }
        log.frames_written.push(frame.dimensions());
        Ok(())
    }

    fn finish(self: Box<Self>) -> SinkResult<PathBuf> {
        let mut log = self.log.borrow_mut();
        log.events.push("finish".into());
        if log.fail_finish {
            return Err("muxer did not reach EOS".into());
        }
        log.finished.push(self.path.clone());
        Ok(self.path)
    }
}

struct Harness {
    engine: CaptureEngine,
    script: Script,
    log: SharedLog,
    dir: PathBuf,
}

impl Harness {
    fn new(table: &[(u32, BackendHint, Behavior)], tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = std::env::temp_dir().join(format!("survey-camera-test-{}", Uuid::new_v4()));
        let mut config = Config {
            candidates: table
                .iter()
                .map(|(index, backend, _)| ProbeCandidate::new(*index, *backend))
                .collect(),
            probe_resolution: None,
            output_dir: dir.clone(),
            measurement_type: MeasurementType::Noise,
            preview_height: 24,
            ..Config::default()
        };
        tweak(&mut config);

        let script: Script = Rc::new(RefCell::new(
            table
                .iter()
                .map(|(index, backend, behavior)| ((*index, *backend), *behavior))
                .collect(),
        ));
        let log = SharedLog::default();
        let engine = CaptureEngine::new(
            &config,
            Box::new(FakeDriver {
                script: Rc::clone(&script),
                log: Rc::clone(&log),
            }),
            Box::new(FakeSinks {
                log: Rc::clone(&log),
            }),
        );
        Self {
            engine,
            script,
            log,
            dir,
        }
    }

    /// One working camera at index 0
    fn single() -> Self {
        Self::new(&[(0, BackendHint::Default, Behavior::Frames(64, 48))], |_| {})
    }

    fn started() -> Self {
        let mut h = Self::single();
        h.engine.start().unwrap();
        h
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

// Device probing

#[test]
fn test_probe_selects_first_usable_candidate() {
    let mut h = Harness::new(
        &[
            (0, BackendHint::Default, Behavior::FailOpen),
            (1, BackendHint::PlatformNative, Behavior::EmptyFrames),
            (2, BackendHint::Default, Behavior::Frames(64, 48)),
            (3, BackendHint::V4l2, Behavior::Frames(64, 48)),
        ],
        |_| {},
    );

    h.engine.start().unwrap();

    let device = h.engine.device().expect("device open");
    assert_eq!(device.index(), 2);
    assert_eq!(device.backend(), BackendHint::Default);
    assert_eq!(h.engine.status(), "");
    assert!(h.engine.is_running());

    let log = h.log.borrow();
    // Candidate 3 is never attempted
    assert_eq!(log.opened.len(), 3);
    // The empty-frame device was released before index 2 was kept
    assert_eq!(log.live_devices, 1);
}

#[test]
fn test_probe_failure_leaves_no_device_open() {
    let mut h = Harness::new(
        &[
            (0, BackendHint::Default, Behavior::FailOpen),
            (0, BackendHint::V4l2, Behavior::EmptyFrames),
            (1, BackendHint::Default, Behavior::EmptyFrames),
        ],
        |_| {},
    );

    let err = h.engine.start().unwrap_err();
    let CameraError::NoDeviceFound { diagnostics } = err else {
        panic!("expected NoDeviceFound");
    };
    assert_eq!(diagnostics.len(), 3);
    assert_eq!(h.log.borrow().live_devices, 0);
    assert!(h.engine.device().is_none());
    assert!(!h.engine.is_running());
    assert!(h.engine.status().starts_with("Error: No camera device found"));

    // Ticks do nothing without a device
    assert_eq!(h.engine.tick(), TickOutcome::Idle);
}

#[test]
fn test_reprobe_recovers_after_failure() {
    let mut h = Harness::new(&[(0, BackendHint::Default, Behavior::FailOpen)], |_| {});
    assert!(h.engine.start().is_err());

    h.script
        .borrow_mut()
        .insert((0, BackendHint::Default), Behavior::Frames(32, 24));
    h.engine.reprobe().unwrap();

    assert_eq!(h.engine.status(), "");
    assert!(matches!(h.engine.tick(), TickOutcome::Frame { .. }));
}

// Frame pump

#[test]
fn test_failed_read_keeps_previous_frame() {
    let mut h = Harness::started();
    assert_eq!(h.engine.tick(), TickOutcome::Frame { recorded: false });
    let first = h.engine.last_frame().unwrap().captured_at;

    h.log.borrow_mut().failing_reads = 1;
    assert_eq!(h.engine.tick(), TickOutcome::Skipped);
    assert_eq!(h.engine.last_frame().unwrap().captured_at, first);
    assert!(h.engine.preview().is_some());
    assert!(!h.engine.status().starts_with("Error"));
}

#[test]
fn test_rotation_applies_to_clean_frame_and_recording() {
    let mut h = Harness::new(&[(0, BackendHint::Default, Behavior::Frames(64, 48))], |c| {
        c.rotation = SensorRotation::Rotate270;
    });
    h.engine.start().unwrap();
    h.engine.tick();

    assert_eq!(h.engine.last_frame().unwrap().dimensions(), (48, 64));
    // Preview keeps the rotated aspect at the fixed height
    let preview = h.engine.preview().unwrap();
    assert_eq!((preview.width, preview.height), (18, 24));

    h.engine.toggle_record_stop().unwrap();
    h.engine.tick();

    let log = h.log.borrow();
    assert_eq!((log.sinks[0].1, log.sinks[0].2), (48, 64));
    assert_eq!(log.frames_written, vec![(48, 64)]);
}

#[test]
fn test_poll_runs_only_due_ticks() {
    let mut h = Harness::new(&[(0, BackendHint::Default, Behavior::Frames(8, 6))], |c| {
        c.tick_rate_hz = 10;
    });
    h.engine.start().unwrap();

    let now = Instant::now();
    assert!(h.engine.poll(now).is_some());
    assert!(h.engine.poll(now + Duration::from_millis(10)).is_none());
    assert!(h.engine.poll(now + Duration::from_millis(150)).is_some());
}

// Photo capture

#[test]
fn test_photo_before_first_tick_is_not_ready() {
    let mut h = Harness::started();

    assert_eq!(h.engine.take_photo(), Err(CameraError::NotReady));
    assert_eq!(h.engine.capture_count(), 0);
    assert_eq!(h.engine.status(), "Error: Camera not ready");
}

#[test]
fn test_photo_writes_full_resolution_clean_frame() {
    let mut h = Harness::started();
    h.engine.tick();

    let path = h.engine.take_photo().unwrap();

    assert_eq!(h.engine.capture_count(), 1);
    assert_eq!(h.engine.status(), "Photo saved!");
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("RUI_Foto_"), "unexpected name {}", name);
    assert!(name.ends_with(".jpg"));
    assert_eq!(path.parent(), Some(h.dir.as_path()));

    // Written from the 64x48 clean frame, not the 24 px tall preview
    let image = image::open(&path).unwrap();
    assert_eq!((image.width(), image.height()), (64, 48));
}

#[test]
fn test_extinguisher_photo_uses_its_own_prefix() {
    let mut h = Harness::started();
    h.engine.tick();

    let path = h.engine.take_extinguisher_photo().unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("EXT_Foto_"));
}

#[test]
fn test_photo_status_clears_after_flash() {
    let mut h = Harness::started();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    h.engine
        .set_status_listener(Box::new(move |msg| sink.borrow_mut().push(msg.to_string())));

    h.engine.tick();
    h.engine.take_photo().unwrap();
    let revision = h.engine.status_revision();

    h.engine.poll(Instant::now() + Duration::from_secs(3));

    assert_eq!(h.engine.status(), "");
    assert!(h.engine.status_revision() > revision);
    assert_eq!(*seen.borrow(), vec!["Photo saved!".to_string(), String::new()]);
}

// Recording

#[test]
fn test_record_before_first_frame_is_not_ready() {
    let mut h = Harness::started();

    assert_eq!(h.engine.toggle_record_stop(), Err(CameraError::NotReady));
    assert!(!h.engine.is_recording());
    assert!(h.log.borrow().sinks.is_empty());
}

#[test]
fn test_record_pause_resume_stop_sequence() {
    let mut h = Harness::started();
    h.engine.tick();

    let mut states = vec![h.engine.recorder_state()];

    let RecordToggle::Started(path) = h.engine.toggle_record_stop().unwrap() else {
        panic!("expected a new recording");
    };
    states.push(h.engine.recorder_state());
    assert!(
        path.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("RUI_Video_")
    );
    assert_eq!(h.log.borrow().sinks[0].3, Framerate::from_int(30));

    h.engine.tick();
    h.engine.tick();

    assert_eq!(h.engine.toggle_pause(), Ok(RecorderState::Paused));
    states.push(h.engine.recorder_state());
    assert!(h.engine.is_paused());
    assert_eq!(h.engine.status(), "Recording paused");

    // Paused ticks still refresh the clean frame but write nothing
    for _ in 0..3 {
        assert_eq!(h.engine.tick(), TickOutcome::Frame { recorded: false });
    }

    assert_eq!(h.engine.toggle_pause(), Ok(RecorderState::Recording));
    states.push(h.engine.recorder_state());
    assert_eq!(h.engine.tick(), TickOutcome::Frame { recorded: true });

    let RecordToggle::Stopped(Some(finished)) = h.engine.toggle_record_stop().unwrap() else {
        panic!("expected a finished recording");
    };
    states.push(h.engine.recorder_state());

    assert_eq!(
        states,
        vec![
            RecorderState::Idle,
            RecorderState::Recording,
            RecorderState::Paused,
            RecorderState::Recording,
            RecorderState::Idle,
        ]
    );
    assert_eq!(finished.path, path);
    assert_eq!(finished.frames, 3);
    assert_eq!(h.log.borrow().frames_written.len(), 3);
    assert_eq!(h.engine.capture_count(), 1);
}

#[test]
fn test_pause_unsupported_is_reported() {
    let mut h = Harness::new(&[(0, BackendHint::Default, Behavior::Frames(16, 12))], |c| {
        c.pause_supported = false;
    });
    h.engine.start().unwrap();
    h.engine.tick();
    h.engine.toggle_record_stop().unwrap();

    assert_eq!(h.engine.toggle_pause(), Err(CameraError::PauseUnsupported));
    assert_eq!(h.engine.status(), "Error: Pause not available on this device");
    assert_eq!(h.engine.recorder_state(), RecorderState::Recording);
    assert_eq!(h.engine.tick(), TickOutcome::Frame { recorded: true });
}

#[test]
fn test_pause_without_recording() {
    let mut h = Harness::started();
    h.engine.tick();

    assert_eq!(h.engine.toggle_pause(), Err(CameraError::NotRecording));
    assert_eq!(h.engine.recorder_state(), RecorderState::Idle);
}

#[test]
fn test_write_failure_abandons_session() {
    let mut h = Harness::started();
    h.log.borrow_mut().fail_write_at = Some(1);
    h.engine.tick();
    h.engine.toggle_record_stop().unwrap();

    assert_eq!(h.engine.tick(), TickOutcome::Frame { recorded: true });
    assert_eq!(h.engine.tick(), TickOutcome::Frame { recorded: false });

    assert!(!h.engine.is_recording());
    assert!(h.engine.status().starts_with("Error: Write failed"));
    assert_eq!(h.engine.capture_count(), 0);
    assert!(h.log.borrow().finished.is_empty());

    // The engine stays usable
    h.log.borrow_mut().fail_write_at = None;
    assert!(matches!(
        h.engine.toggle_record_stop(),
        Ok(RecordToggle::Started(_))
    ));
}

#[test]
fn test_output_open_failure_leaves_recorder_idle() {
    let mut h = Harness::started();
    h.log.borrow_mut().fail_open = true;
    h.engine.tick();

    let result = h.engine.toggle_record_stop();

    assert!(matches!(result, Err(CameraError::WriteFailure(_))));
    assert_eq!(h.engine.recorder_state(), RecorderState::Idle);
    assert!(h.engine.status().starts_with("Error: Write failed"));
    assert_eq!(h.engine.capture_count(), 0);
    assert_eq!(h.engine.tick(), TickOutcome::Frame { recorded: false });
    let log = h.log.borrow();
    assert!(log.sinks.is_empty());
    assert!(log.frames_written.is_empty());
    assert_eq!(log.live_devices, 1);
}

#[test]
fn test_finalize_failure_on_stop_still_releases_device() {
    let mut h = Harness::started();
    h.log.borrow_mut().fail_finish = true;
    h.engine.tick();
    h.engine.toggle_record_stop().unwrap();
    h.engine.tick();

    let result = h.engine.stop();

    assert!(matches!(result, Err(CameraError::WriteFailure(_))));
    assert_eq!(h.engine.recorder_state(), RecorderState::Idle);
    assert!(!h.engine.is_running());
    assert!(h.engine.status().starts_with("Error: Write failed"));
    assert_eq!(h.engine.capture_count(), 0);
    let log = h.log.borrow();
    assert_eq!(log.events, vec!["finish".to_string(), "release".to_string()]);
    assert!(log.finished.is_empty());
    assert_eq!(log.live_devices, 0);
}

// Shutdown

#[test]
fn test_stop_closes_recording_before_releasing_device() {
    let mut h = Harness::started();
    h.engine.tick();
    h.engine.toggle_record_stop().unwrap();
    h.engine.tick();

    h.engine.stop().unwrap();

    assert!(!h.engine.is_running());
    assert!(!h.engine.is_recording());
    assert_eq!(h.engine.capture_count(), 1);
    assert_eq!(h.engine.status(), "Camera paused");
    let log = h.log.borrow();
    assert_eq!(log.events, vec!["finish".to_string(), "release".to_string()]);
    assert_eq!(log.live_devices, 0);
}

#[test]
fn test_no_writes_after_stop() {
    let mut h = Harness::started();
    h.engine.tick();
    h.engine.toggle_record_stop().unwrap();
    h.engine.tick();
    h.engine.stop().unwrap();

    assert_eq!(h.engine.tick(), TickOutcome::Idle);
    assert_eq!(h.engine.poll(Instant::now() + Duration::from_secs(1)), None);
    assert_eq!(h.log.borrow().frames_written.len(), 1);
    assert!(h.engine.last_frame().is_none());
}

#[test]
fn test_stop_twice_is_a_no_op() {
    let mut h = Harness::started();
    h.engine.tick();
    h.engine.toggle_record_stop().unwrap();

    h.engine.stop().unwrap();
    let count = h.engine.capture_count();
    h.engine.stop().unwrap();

    assert_eq!(h.engine.capture_count(), count);
    assert_eq!(h.log.borrow().finished.len(), 1);
}

#[test]
fn test_stop_from_paused_closes_recording() {
    let mut h = Harness::started();
    h.engine.tick();
    h.engine.toggle_record_stop().unwrap();
    h.engine.toggle_pause().unwrap();

    h.engine.exit().unwrap();

    assert_eq!(h.engine.recorder_state(), RecorderState::Idle);
    assert_eq!(h.engine.capture_count(), 1);
    assert_eq!(h.engine.status(), "");
}

#[test]
fn test_dropping_engine_flushes_recording() {
    let mut h = Harness::started();
    let log = Rc::clone(&h.log);
    h.engine.tick();
    h.engine.toggle_record_stop().unwrap();
    drop(h);

    let log = log.borrow();
    assert_eq!(log.finished.len(), 1);
    assert_eq!(log.live_devices, 0);
}

// Lens selection

fn lens_table(working: &[u32]) -> Vec<(u32, BackendHint, Behavior)> {
    (0..5)
        .map(|index| {
            let behavior = if working.contains(&index) {
                Behavior::Frames(40, 30)
            } else {
                Behavior::FailOpen
            };
            (index, BackendHint::Default, behavior)
        })
        .collect()
}

#[test]
fn test_front_lens_uses_index_one() {
    let mut h = Harness::new(&lens_table(&[0, 1]), |_| {});
    h.engine.start().unwrap();

    assert_eq!(h.engine.select_lens(Lens::Front), Ok(Lens::Front));
    assert_eq!(h.engine.device().unwrap().index(), 1);
    assert_eq!(h.engine.lens(), Lens::Front);
}

#[test]
fn test_wide_lens_tries_indices_then_falls_back() {
    let mut h = Harness::new(&lens_table(&[0]), |_| {});
    h.engine.start().unwrap();
    h.log.borrow_mut().opened.clear();

    assert_eq!(h.engine.select_lens(Lens::Wide), Ok(Lens::Main));

    let tried: Vec<u32> = h.log.borrow().opened.iter().map(|c| c.index).collect();
    assert_eq!(tried, vec![2, 3, 4, 0]);
    assert_eq!(h.engine.device().unwrap().index(), 0);
    assert_eq!(h.engine.status(), "Lens not available");
}

#[test]
fn test_wide_lens_found_at_later_index() {
    let mut h = Harness::new(&lens_table(&[0, 3]), |_| {});
    h.engine.start().unwrap();

    assert_eq!(h.engine.select_lens(Lens::Wide), Ok(Lens::Wide));
    assert_eq!(h.engine.device().unwrap().index(), 3);
    assert_eq!(h.log.borrow().live_devices, 1);
}

#[test]
fn test_lens_switch_refused_while_recording() {
    let mut h = Harness::new(&lens_table(&[0, 1]), |_| {});
    h.engine.start().unwrap();
    h.engine.tick();
    h.engine.toggle_record_stop().unwrap();

    assert_eq!(
        h.engine.select_lens(Lens::Front),
        Err(CameraError::AlreadyRecording)
    );
    assert!(h.engine.is_recording());
    assert_eq!(h.engine.device().unwrap().index(), 0);
}
