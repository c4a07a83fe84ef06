// SPDX-License-Identifier: GPL-3.0-only

//! Terminal capture shell
//!
//! Drives the capture engine from the terminal event loop and renders its
//! preview texture with Unicode half-block characters for improved vertical
//! resolution.

use crate::config::Config;
use crate::engine::{CaptureEngine, RecordToggle};
use crate::pipelines::preview::PreviewBuffer;
use crate::storage::MeasurementType;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Longest wait for input between engine polls
const MAX_INPUT_WAIT: Duration = Duration::from_millis(50);

/// Run the terminal capture shell
pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = CaptureEngine::with_gstreamer(config)?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut engine, config.measurement_type);

    // Release the camera before handing the terminal back
    if let Err(e) = engine.exit() {
        error!(error = %e, "Failed to stop capture engine");
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Actions bound to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Photo,
    ExtinguisherPhoto,
    RecordStop,
    Pause,
    CycleLens,
    Reprobe,
    Help,
    Quit,
}

fn action_for(code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('p') => Some(Action::Photo),
        KeyCode::Char('e') => Some(Action::ExtinguisherPhoto),
        KeyCode::Char('r') => Some(Action::RecordStop),
        KeyCode::Char(' ') => Some(Action::Pause),
        KeyCode::Char('l') => Some(Action::CycleLens),
        KeyCode::Char('s') => Some(Action::Reprobe),
        KeyCode::Char('h') => Some(Action::Help),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    engine: &mut CaptureEngine,
    measurement: MeasurementType,
) -> Result<(), Box<dyn std::error::Error>> {
    // A failed probe is shown in the status bar; 's' retries
    if let Err(e) = engine.start() {
        info!(error = %e, "No camera at startup");
    }

    let mut show_help = false;

    loop {
        let now = Instant::now();
        engine.poll(now);

        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                height: area.height.saturating_sub(1),
                ..area
            };
            f.render_widget(
                PreviewWidget {
                    preview: engine.preview(),
                    running: engine.is_running(),
                },
                camera_area,
            );

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            let message = if show_help {
                build_help_message(measurement)
            } else {
                build_status_message(engine, measurement)
            };
            f.render_widget(
                StatusBar {
                    message: &message,
                    recording: engine.is_recording() && !engine.is_paused(),
                },
                status_area,
            );
        })?;

        let wait = engine
            .time_until_tick(Instant::now())
            .map_or(MAX_INPUT_WAIT, |d| d.min(MAX_INPUT_WAIT));

        if event::poll(wait)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(action) = action_for(key.code, key.modifiers)
        {
            if action != Action::Help {
                show_help = false;
            }
            // Engine errors are already on the status board
            match action {
                Action::Quit => break,
                Action::Help => show_help = !show_help,
                Action::Photo => {
                    let _ = engine.take_photo();
                }
                Action::ExtinguisherPhoto if measurement.has_extinguisher_photos() => {
                    let _ = engine.take_extinguisher_photo();
                }
                Action::ExtinguisherPhoto => {}
                Action::RecordStop => {
                    if let Ok(RecordToggle::Stopped(Some(finished))) = engine.toggle_record_stop() {
                        info!(path = %finished.path.display(), frames = finished.frames, "Video saved");
                    }
                }
                Action::Pause => {
                    let _ = engine.toggle_pause();
                }
                Action::CycleLens => {
                    let _ = engine.cycle_lens();
                }
                Action::Reprobe => {
                    let _ = engine.reprobe();
                }
            }
        }
    }

    Ok(())
}

fn build_status_message(engine: &CaptureEngine, measurement: MeasurementType) -> String {
    let mut msg = String::new();
    if engine.is_paused() {
        msg.push_str("[PAUSED] ");
    } else if engine.is_recording() {
        msg.push_str("[REC] ");
    }
    msg.push_str(&format!(
        "{} | {} lens | captures: {}",
        measurement.display_name(),
        engine.lens(),
        engine.capture_count()
    ));
    if !engine.status().is_empty() {
        msg.push_str(" | ");
        msg.push_str(engine.status());
    }
    msg.push_str(" | 'h' help");
    msg
}

fn build_help_message(measurement: MeasurementType) -> String {
    let mut msg = String::from("p: Photo | ");
    if measurement.has_extinguisher_photos() {
        msg.push_str("e: Extinguisher photo | ");
    }
    msg.push_str("r: Record/stop | space: Pause | l: Lens | s: Search camera | q: Quit");
    msg
}

/// Widget that renders the preview texture using half-block characters
struct PreviewWidget<'a> {
    preview: Option<&'a PreviewBuffer>,
    running: bool,
}

impl Widget for PreviewWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(preview) = self.preview.filter(|p| p.width > 0 && p.height > 0) else {
            let msg = if self.running {
                "Waiting for camera..."
            } else {
                "No camera - press 's' to search"
            };
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Each terminal cell displays 2 vertical pixels
        let aspect = preview.width as f64 / preview.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > aspect {
            let h = term_height;
            ((h * aspect) as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            (w as u16, (w / aspect / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = preview.width as f64 / display_width as f64;
        let y_scale = preview.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(sample(preview, src_x, src_y_top));
                    cell.set_bg(sample(preview, src_x, src_y_bottom));
                }
            }
        }
    }
}

fn sample(preview: &PreviewBuffer, x: u32, y: u32) -> Color {
    let x = x.min(preview.width - 1);
    let y = y.min(preview.height - 1);
    match preview.pixel_top_down(x, y) {
        Some([r, g, b, _]) => Color::Rgb(r, g, b),
        None => Color::Black,
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    recording: bool,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = if self.recording {
            Color::Red
        } else {
            Color::DarkGray
        };

        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(bg);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default().fg(Color::White).bg(bg),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        let none = KeyModifiers::NONE;
        assert_eq!(action_for(KeyCode::Char('p'), none), Some(Action::Photo));
        assert_eq!(action_for(KeyCode::Char(' '), none), Some(Action::Pause));
        assert_eq!(
            action_for(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(Action::Quit)
        );
        assert_eq!(action_for(KeyCode::Char('c'), none), None);
    }

    #[test]
    fn test_help_mentions_extinguisher_only_for_fire_safety() {
        assert!(build_help_message(MeasurementType::FireSafety).contains("Extinguisher"));
        assert!(!build_help_message(MeasurementType::Noise).contains("Extinguisher"));
    }

    #[test]
    fn test_preview_widget_draws_top_row_first() {
        // 1x2 texture stored bottom-up: row 0 is the bottom (blue), row 1 the top (red)
        let preview = PreviewBuffer {
            width: 1,
            height: 2,
            rgba: vec![0, 0, 255, 255, 255, 0, 0, 255],
        };
        let area = Rect::new(0, 0, 1, 1);
        let mut buf = Buffer::empty(area);
        PreviewWidget {
            preview: Some(&preview),
            running: true,
        }
        .render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }
}
