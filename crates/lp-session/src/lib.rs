//! Interactive UART session for the Launchpad tool.
//!
//! Two cooperating workers share one device and one terminal: the
//! foreground session controller reads keystrokes and drives the
//! passthrough/command mode machine, while the background poller sweeps
//! every enabled core for UART bytes and multiplexes them onto the screen.
//! Driver calls are serialized by the device mutex; painting is mediated by
//! three independent atomic signals (`paint_ok`, `poll_enabled`,
//! `discard_paused_output`) plus a process-wide shutdown latch.

pub mod command;
pub mod events;
pub mod input;
pub mod lifecycle;
pub mod output;
pub mod paint;
pub mod poller;
pub mod process;
pub mod screen;
pub mod session;
pub mod state;
pub mod terminal;

pub use command::{COMMAND_LIMIT, Command, CommandOutcome};
pub use lifecycle::{LifecycleError, load_and_distribute, start_enabled_cores};
pub use screen::Screen;
pub use session::{Session, run_session};
pub use state::{DeviceStatus, SessionFlags, SessionShared};
pub use terminal::{SessionTerminal, TerminalGuard};
