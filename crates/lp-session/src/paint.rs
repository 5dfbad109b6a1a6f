//! Paint seams between the workers and the screen.
//!
//! The poller and the command processor paint through small traits rather
//! than holding the screen directly: the production implementation wraps
//! the shared [`Screen`], tests substitute capture sinks. Paint failures
//! are terminal I/O errors with nothing useful to do about them mid-
//! session; they are logged and swallowed here so the callers stay
//! straight-line.

use crate::screen::Screen;
use std::sync::{Arc, Mutex};
use tracing::error;

/// Where the poller's output goes.
pub trait PaintSink: Send {
    /// Raw stream bytes (single-core mode and pause-buffer drains).
    fn stream(&mut self, bytes: &[u8]);
    /// One complete line from `core`, terminator included.
    fn line(&mut self, core: usize, line: &[u8]);
    /// Out-of-band warning text (no trailing newline).
    fn warning(&mut self, message: &str);
}

/// Where the command processor's output goes.
pub trait SessionPaint {
    fn panel(&mut self, text: &str);
    fn notice(&mut self, message: &str);
    fn error_line(&mut self, message: &str);
    fn wait_line(&mut self, message: &str);
    fn clear_screen(&mut self);
}

/// Production painter over the shared screen.
#[derive(Clone)]
pub struct ScreenPainter {
    screen: Arc<Mutex<Screen>>,
}

impl ScreenPainter {
    pub fn new(screen: Arc<Mutex<Screen>>) -> Self {
        Self { screen }
    }

    fn with_screen(&self, op: impl FnOnce(&mut Screen) -> anyhow::Result<()>) {
        let mut screen = self.screen.lock().expect("screen poisoned");
        if let Err(e) = op(&mut screen) {
            error!(target: "session.screen", error = %e, "paint_failed");
        }
    }
}

impl PaintSink for ScreenPainter {
    fn stream(&mut self, bytes: &[u8]) {
        self.with_screen(|s| s.stream_bytes(bytes));
    }

    fn line(&mut self, core: usize, line: &[u8]) {
        self.with_screen(|s| {
            let mut prefixed = format!("[{core}]: ").into_bytes();
            prefixed.extend_from_slice(line);
            s.stream_bytes(&prefixed)
        });
    }

    fn warning(&mut self, message: &str) {
        self.with_screen(|s| s.stream_str(&format!("{message}\n")));
    }
}

impl SessionPaint for ScreenPainter {
    fn panel(&mut self, text: &str) {
        self.with_screen(|s| s.panel(text));
    }

    fn notice(&mut self, message: &str) {
        self.with_screen(|s| s.notice(message));
    }

    fn error_line(&mut self, message: &str) {
        self.with_screen(|s| s.error_line(message));
    }

    fn wait_line(&mut self, message: &str) {
        self.with_screen(|s| s.wait_line(message));
    }

    fn clear_screen(&mut self) {
        self.with_screen(|s| s.clear_all());
    }
}
