// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Probing for a working camera
//! - Taking photos
//! - Recording videos
//! - Inspecting the configuration

use std::path::PathBuf;
use std::time::{Duration, Instant};
use survey_camera::backends::camera::{DeviceProber, GstCameraDriver};
use survey_camera::{CameraError, CaptureEngine, Config, RecordToggle, TickOutcome};
use tracing::{info, warn};

/// Ticks allowed while waiting for the first usable frame
const MAX_WARMUP_TICKS: u32 = 150;

/// Run the prober once and report the accepted candidate
pub fn probe(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut driver = GstCameraDriver::new(config.read_timeout())?;
    let prober = DeviceProber::new(config.candidates.clone(), config.probe_resolution);

    println!("Probing {} candidates...", prober.candidates().len());

    match prober.probe(&mut driver) {
        Ok(handle) => {
            println!("Camera found: {}", handle.candidate());
            println!("  Device: {}", handle.describe());
            println!("  Opened: {}", handle.opened_at().format("%H:%M:%S"));
            handle.release();
            Ok(())
        }
        Err(CameraError::NoDeviceFound { diagnostics }) => {
            println!("No camera found.");
            println!();
            for line in &diagnostics {
                println!("  {}", line);
            }
            Err(CameraError::NoDeviceFound { diagnostics }.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Take a photo after pumping `warmup` frames
pub fn take_photo(
    config: &Config,
    warmup: u32,
    extinguisher: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = CaptureEngine::with_gstreamer(config)?;
    engine.start()?;
    print_device(&engine);

    println!("Capturing...");
    let frames = pump_frames(&mut engine, warmup.max(1));
    info!(frames, "Warm-up finished");

    let result = if extinguisher {
        engine.take_extinguisher_photo()
    } else {
        engine.take_photo()
    };
    engine.exit()?;

    let path = result?;
    println!("Photo saved: {}", path.display());
    Ok(())
}

/// Record a video for `duration` seconds, or until Ctrl+C
pub fn record_video(config: &Config, duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = CaptureEngine::with_gstreamer(config)?;
    engine.start()?;
    print_device(&engine);

    // Recording needs a clean frame to size the output
    if pump_frames(&mut engine, 1) == 0 {
        engine.exit()?;
        return Err(CameraError::NotReady.into());
    }

    let RecordToggle::Started(path) = engine.toggle_record_stop()? else {
        return Err("Recording did not start".into());
    };

    println!("Output: {}", path.display());
    println!("Duration: {} seconds", duration);
    println!();
    println!("Recording... (press Ctrl+C to stop early)");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let pumped = rt.block_on(pump_until(
        &mut engine,
        config.tick_interval(),
        Duration::from_secs(duration),
    ));
    println!();

    // A write failure during the run already closed the session
    let finished = if engine.is_recording() {
        match engine.toggle_record_stop()? {
            RecordToggle::Stopped(finished) => finished,
            RecordToggle::Started(_) => None,
        }
    } else {
        None
    };
    engine.exit()?;
    pumped?;

    match finished {
        Some(finished) => {
            println!(
                "Video saved: {} ({} frames)",
                finished.path.display(),
                finished.frames
            );
            Ok(())
        }
        None => Err("Recording was abandoned, see the log for details".into()),
    }
}

/// Print the effective configuration, optionally saving it
pub fn show_config(
    config: &Config,
    path: Option<PathBuf>,
    write: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match &path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory"),
    }
    println!("{}", serde_json::to_string_pretty(config)?);

    if write {
        let path = path.ok_or("No config directory on this system")?;
        config.save_to(&path)?;
        println!("Saved: {}", path.display());
    }
    Ok(())
}

fn print_device(engine: &CaptureEngine) {
    if let Some(device) = engine.device() {
        println!("Using camera: {} ({})", device.candidate(), device.describe());
    }
}

/// Tick until `wanted` frames were stored; returns how many were
fn pump_frames(engine: &mut CaptureEngine, wanted: u32) -> u32 {
    let mut stored = 0;
    for _ in 0..MAX_WARMUP_TICKS {
        if stored >= wanted {
            break;
        }
        if let Some(wait) = engine.time_until_tick(Instant::now()) {
            std::thread::sleep(wait);
        }
        if let Some(TickOutcome::Frame { .. }) = engine.poll(Instant::now()) {
            stored += 1;
        }
    }
    stored
}

/// Drive the frame pump on a tokio interval until `duration` elapses or
/// Ctrl+C arrives
async fn pump_until(
    engine: &mut CaptureEngine,
    tick: Duration,
    duration: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let start = Instant::now();
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            result = &mut ctrl_c => {
                result?;
                println!();
                println!("Stopping early...");
                break;
            }
            _ = interval.tick() => {
                engine.tick();
                if !engine.is_recording() {
                    // The session was abandoned; the status has the reason
                    warn!(status = engine.status(), "Recording stopped unexpectedly");
                    break;
                }
                let elapsed = start.elapsed().as_secs();
                print!(
                    "\rRecording: {:02}:{:02} ({} frames)",
                    elapsed / 60,
                    elapsed % 60,
                    engine.frames_recorded()
                );
                std::io::Write::flush(&mut std::io::stdout())?;
            }
        }
    }
    Ok(())
}
