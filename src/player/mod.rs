//! Player — the runtime playback controller.
//!
//! Pulls frames from an effect and writes them to the terminal in place.
//! The player does not interpret frames; each one is a complete canvas that
//! replaces the previous one.

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use crossterm::{cursor, execute, queue, style, terminal};
use log::debug;

use crate::engine::terminal::{Canvas, TerminalConfig};

pub struct Player {
    canvas: Canvas,
    frame_interval: Option<Duration>,
}

impl Player {
    pub fn new(canvas: Canvas, config: &TerminalConfig) -> Self {
        let frame_interval = (config.frame_rate > 0)
            .then(|| Duration::from_secs_f64(1.0 / config.frame_rate as f64));
        Self {
            canvas,
            frame_interval,
        }
    }

    /// Play every frame of `frames`.
    ///
    /// Hides the cursor, reserves the canvas rows below the prompt and
    /// restores the cursor on exit (even on error).
    pub fn play(&self, frames: impl Iterator<Item = String>) -> Result<()> {
        let need_h = self.canvas.height as u16;
        if let Ok((_, term_h)) = terminal::size() {
            if term_h < need_h {
                bail!("Terminal too small: need {} rows, have {}", need_h, term_h);
            }
        }

        let mut stdout = io::stdout();
        execute!(stdout, cursor::Hide)?;

        let result = self.run_loop(&mut stdout, frames);

        // Always restore terminal state.
        let _ = execute!(stdout, style::ResetColor, cursor::Show);

        result
    }

    fn run_loop(&self, stdout: &mut io::Stdout, frames: impl Iterator<Item = String>) -> Result<()> {
        let rows = self.canvas.height as u16;
        for _ in 0..rows {
            stdout.write_all(b"\n")?;
        }

        let mut played = 0usize;
        for frame in frames {
            let started = Instant::now();
            self.render_frame(stdout, &frame)?;
            played += 1;
            if let Some(interval) = self.frame_interval {
                if let Some(remaining) = interval.checked_sub(started.elapsed()) {
                    thread::sleep(remaining);
                }
            }
        }
        debug!("played {played} frames");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn render_frame(&self, stdout: &mut io::Stdout, frame: &str) -> Result<()> {
        let rows = self.canvas.height as u16;
        queue!(
            stdout,
            cursor::MoveToPreviousLine(rows),
            terminal::Clear(terminal::ClearType::FromCursorDown),
        )?;
        for line in frame.split('\n') {
            queue!(stdout, style::Print(line), style::Print("\r\n"))?;
        }
        stdout.flush()?;
        Ok(())
    }
}
