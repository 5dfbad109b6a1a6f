//! Terminal mode management.
//!
//! Raw mode plus the alternate screen, behind an RAII guard so the
//! terminal is restored on every exit path, including panics and fatal
//! device errors unwinding out of the session. The cursor stays visible;
//! the session uses it as the live output position.

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};
use std::io::stdout;

pub struct SessionTerminal {
    entered: bool,
}

/// Guard ensuring terminal restoration even if the caller early-returns or
/// panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut SessionTerminal,
}

impl Default for SessionTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTerminal {
    pub fn new() -> Self {
        Self { entered: false }
    }

    pub fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, SetTitle("Launchpad"))?;
            self.entered = true;
        }
        Ok(())
    }

    pub fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    /// Enter and return a guard that will leave on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard { backend: self })
    }
}

impl Drop for SessionTerminal {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        let _ = self.backend.leave();
    }
}
