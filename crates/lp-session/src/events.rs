//! Events consumed by the session controller.
//!
//! One bounded channel, two producers: the async keyboard task and the
//! blocking UART poller (which only ever sends a terminal fault). Bounding
//! gives natural backpressure on paste storms without dropping keystrokes.

use lp_device::DeviceError;

/// Capacity of the session event channel.
pub const EVENT_CHANNEL_CAP: usize = 1024;

/// Keys the session cares about, already normalized from the raw terminal
/// event. Backspace covers the three common encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
    Esc,
    Backspace,
    CtrlC,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyInput),
    Resize(u16, u16),
    /// Fatal driver failure observed by the poller; the controller owns
    /// terminal teardown, so the fault travels to it instead of being
    /// handled on the worker.
    Fault(DeviceError),
}
