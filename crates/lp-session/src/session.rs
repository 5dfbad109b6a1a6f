//! Session controller: the foreground worker.
//!
//! Owns the terminal and the mode state machine. Keystrokes either pass
//! straight through to every enabled core's UART input or accumulate into
//! a command line on the reserved bottom row; the poller keeps painting in
//! parallel, gated by `paint_ok`.

use crate::command::{self, COMMAND_LIMIT, CommandOutcome};
use crate::events::{EVENT_CHANNEL_CAP, Event, KeyInput};
use crate::input::spawn_input_task;
use crate::paint::ScreenPainter;
use crate::poller::UartPoller;
use crate::process;
use crate::screen::Screen;
use crate::state::SessionShared;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tracing::{error, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Passthrough,
    Command,
}

enum LoopControl {
    Continue,
    Quit,
}

pub struct Session {
    shared: Arc<SessionShared>,
    screen: Arc<Mutex<Screen>>,
    mode: Mode,
    command_buffer: String,
}

/// Convenience wrapper: build the screen from the live terminal and run.
pub async fn run_session(shared: Arc<SessionShared>) -> Result<()> {
    let screen = Screen::new()?;
    Session::new(shared, screen).run().await
}

impl Session {
    pub fn new(shared: Arc<SessionShared>, screen: Screen) -> Self {
        Self {
            shared,
            screen: Arc::new(Mutex::new(screen)),
            mode: Mode::Passthrough,
            command_buffer: String::new(),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        info!(target: "session", "session_started");
        self.paint_startup_banners()?;

        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAP);
        let (input_task, input_shutdown) = spawn_input_task(tx.clone());
        let poller = UartPoller::new(
            self.shared.clone(),
            ScreenPainter::new(self.screen.clone()),
        );
        let poller_task = task::spawn_blocking({
            let tx = tx.clone();
            move || poller.run(tx)
        });
        drop(tx);

        let outcome = loop {
            let Some(event) = rx.recv().await else {
                break Ok(());
            };
            match event {
                Event::Key(key) => match self.handle_key(key) {
                    Ok(LoopControl::Continue) => {}
                    Ok(LoopControl::Quit) => break Ok(()),
                    Err(e) => break Err(e),
                },
                Event::Resize(cols, rows) => {
                    self.screen.lock().expect("screen poisoned").resize(cols, rows);
                }
                Event::Fault(e) => {
                    break Err(anyhow::Error::new(e).context("error calling device function"));
                }
            }
        };

        self.finalize(input_shutdown, input_task, poller_task).await;
        outcome
    }

    fn paint_startup_banners(&self) -> Result<()> {
        let mut screen = self.screen.lock().expect("screen poisoned");
        if !self.shared.status.running() {
            screen.banner_line("Launchpad started but cores idle, use ':h' command for help")?;
        }
        let (has_executable, enabled) = {
            let config = self.shared.config.lock().expect("config poisoned");
            (
                config.executable_path.is_some(),
                config
                    .enabled_on_device(self.shared.device_config.number_cores)
                    .count(),
            )
        };
        if !has_executable {
            screen.banner_line("No executable specified, provide one via the ':exe' command")?;
        }
        if enabled == 0 {
            screen.banner_line("No cores enabled, enable these via the ':e' or ':c' commands")?;
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyInput) -> Result<LoopControl> {
        match self.mode {
            Mode::Passthrough => self.handle_passthrough_key(key),
            Mode::Command => self.handle_command_key(key),
        }
    }

    fn handle_passthrough_key(&mut self, key: KeyInput) -> Result<LoopControl> {
        match key {
            KeyInput::Esc => {
                // Suspend painting before the prompt takes the cursor.
                self.shared.flags.set_paint_ok(false);
                self.mode = Mode::Command;
                self.command_buffer.clear();
                self.screen.lock().expect("screen poisoned").open_prompt()?;
                trace!(target: "session", "command_mode_entered");
            }
            KeyInput::Char(c) => {
                self.screen
                    .lock()
                    .expect("screen poisoned")
                    .stream_str(&c.to_string())?;
                self.forward_char(c)?;
            }
            KeyInput::Enter => {
                self.screen.lock().expect("screen poisoned").stream_str("\n")?;
                self.forward_byte(b'\n')?;
            }
            KeyInput::Backspace => {
                self.forward_byte(0x08)?;
            }
            KeyInput::CtrlC => {
                info!(target: "session", "interrupted");
                return Ok(LoopControl::Quit);
            }
        }
        Ok(LoopControl::Continue)
    }

    fn handle_command_key(&mut self, key: KeyInput) -> Result<LoopControl> {
        match key {
            KeyInput::Esc => {
                // Cancel: discard any captured input and resume silently.
                self.leave_command_mode(true)?;
            }
            KeyInput::Enter => {
                if self.command_buffer.is_empty() {
                    self.leave_command_mode(true)?;
                } else {
                    return self.dispatch_command();
                }
            }
            KeyInput::Backspace => {
                if self.command_buffer.pop().is_some() {
                    self.screen
                        .lock()
                        .expect("screen poisoned")
                        .prompt_backspace()?;
                }
            }
            KeyInput::Char(c) => {
                if self.command_buffer.len() + c.len_utf8() <= COMMAND_LIMIT {
                    self.command_buffer.push(c);
                    self.screen.lock().expect("screen poisoned").prompt_char(c)?;
                }
            }
            KeyInput::CtrlC => {
                info!(target: "session", "interrupted");
                return Ok(LoopControl::Quit);
            }
        }
        Ok(LoopControl::Continue)
    }

    fn leave_command_mode(&mut self, wipe_bottom: bool) -> Result<()> {
        self.mode = Mode::Passthrough;
        self.command_buffer.clear();
        {
            let mut screen = self.screen.lock().expect("screen poisoned");
            if wipe_bottom {
                screen.clear_bottom_line()?;
            }
            screen.restore_main()?;
        }
        self.shared.flags.set_paint_ok(true);
        Ok(())
    }

    fn dispatch_command(&mut self) -> Result<LoopControl> {
        let raw = std::mem::take(&mut self.command_buffer);
        self.mode = Mode::Passthrough;
        info!(target: "session.command", command = raw.as_str(), "dispatch");

        let parsed = command::parse(&raw);
        let mut painter = ScreenPainter::new(self.screen.clone());
        let outcome = process::execute(parsed, &self.shared, &mut painter)?;

        {
            let mut screen = self.screen.lock().expect("screen poisoned");
            match outcome {
                CommandOutcome::Quit => return Ok(LoopControl::Quit),
                CommandOutcome::NewScreen => {
                    // Screen already cleared; painting resumes at origin.
                }
                CommandOutcome::Success => {
                    screen.clear_bottom_line()?;
                    screen.restore_main()?;
                }
                CommandOutcome::NotRecognised => {
                    screen.error_line("Command not recognised")?;
                    screen.restore_main()?;
                }
                CommandOutcome::Error | CommandOutcome::Ignore => {
                    // Error overlay (if any) stays up until the next cycle.
                    screen.restore_main()?;
                }
            }
        }
        self.shared.flags.set_paint_ok(true);
        Ok(LoopControl::Continue)
    }

    /// Forward a printable keystroke to every enabled core.
    fn forward_char(&self, c: char) -> Result<()> {
        let mut utf8 = [0u8; 4];
        for byte in c.encode_utf8(&mut utf8).bytes() {
            self.forward_byte(byte)?;
        }
        Ok(())
    }

    fn forward_byte(&self, byte: u8) -> Result<()> {
        let enabled = self.shared.enabled_on_device();
        let mut device = self.shared.device.lock().expect("device lock poisoned");
        for core in enabled.iter() {
            device
                .write_uart(core, byte)
                .context("error calling device function")?;
        }
        Ok(())
    }

    async fn finalize(
        &mut self,
        input_shutdown: crate::input::InputShutdown,
        input_task: task::JoinHandle<()>,
        poller_task: task::JoinHandle<()>,
    ) {
        info!(target: "session.shutdown", "begin");
        self.shared.flags.trip_shutdown();
        input_shutdown.signal();
        for (name, handle) in [("input", input_task), ("poller", poller_task)] {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(())) => trace!(target: "session.shutdown", task = name, "joined"),
                Ok(Err(e)) => {
                    error!(target: "session.shutdown", task = name, ?e, "join_failed")
                }
                Err(_) => error!(target: "session.shutdown", task = name, "join_timeout"),
            }
        }
        info!(target: "session.shutdown", "complete");
    }
}
