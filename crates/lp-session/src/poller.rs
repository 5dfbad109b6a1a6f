//! Background UART poller.
//!
//! One worker sweeps every enabled core in index order, reading at most one
//! byte per core per step under the device lock, and routes each byte to
//! the screen, the per-core line buffer, or the pause buffer according to
//! the paint/poll/discard signals.
//!
//! Ordering guarantees: bytes from one core reach the screen in arrival
//! order; prefixed lines appear atomically because assembly is per core and
//! flushing is triggered only by the terminating newline; across cores,
//! lines appear in the order their newlines were observed.

use crate::events::Event;
use crate::output::{MAX_BUFFER_SIZE, OutputLine, PauseBuffer, PushOutcome};
use crate::paint::PaintSink;
use crate::state::SessionShared;
use lp_device::DeviceError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};

/// Back-off applied after a sweep that read nothing, keeping the device
/// lock available to the foreground.
const IDLE_BACKOFF: Duration = Duration::from_micros(200);

pub struct UartPoller<S: PaintSink> {
    shared: Arc<SessionShared>,
    sink: S,
    lines: Vec<OutputLine>,
    pause: PauseBuffer,
}

impl<S: PaintSink> UartPoller<S> {
    pub fn new(shared: Arc<SessionShared>, sink: S) -> Self {
        let lines = (0..shared.device_config.number_cores)
            .map(|_| OutputLine::new())
            .collect();
        Self {
            shared,
            sink,
            lines,
            pause: PauseBuffer::new(),
        }
    }

    /// Poll until the shutdown latch trips. A driver failure trips the
    /// latch itself and is reported through the event channel; teardown
    /// belongs to the controller.
    pub fn run(mut self, events: Sender<Event>) {
        info!(target: "uart.poll", "poller_started");
        loop {
            if self.shared.flags.shutdown() {
                break;
            }
            match self.poll_pass() {
                Ok(true) => {}
                Ok(false) => std::thread::sleep(IDLE_BACKOFF),
                Err(e) => {
                    error!(target: "uart.poll", code = e.as_str(), "driver_failure");
                    self.shared.flags.trip_shutdown();
                    let _ = events.blocking_send(Event::Fault(e));
                    break;
                }
            }
        }
        info!(target: "uart.poll", "poller_stopped");
    }

    /// One sweep over the enabled cores. Returns whether any byte was read.
    pub fn poll_pass(&mut self) -> Result<bool, DeviceError> {
        let enabled = self.shared.enabled_on_device();
        let multi = enabled.count() > 1;
        self.drain_gate();
        let mut any = false;
        for core in enabled.iter() {
            any |= self.poll_core(core, multi)?;
        }
        Ok(any)
    }

    /// The only path by which paused output reaches the screen.
    fn drain_gate(&mut self) {
        if self.pause.is_empty() || !self.shared.flags.paint_ok() {
            return;
        }
        if self.shared.flags.discard_paused_output() {
            debug!(target: "uart.poll", dropped = self.pause.len(), "paused_output_discarded");
            self.pause.clear();
        } else {
            let staged = self.pause.take();
            self.sink.stream(&staged);
        }
    }

    fn poll_core(&mut self, core: usize, multi: bool) -> Result<bool, DeviceError> {
        self.drain_gate();
        if !self.shared.flags.poll_enabled() {
            return Ok(false);
        }
        let byte = {
            let mut device = self.shared.device.lock().expect("device lock poisoned");
            if !device.uart_has_data(core)? {
                return Ok(false);
            }
            device.read_uart(core)?
        };
        if multi {
            self.route_multi(core, byte);
        } else {
            self.route_single(byte);
        }
        Ok(true)
    }

    fn route_single(&mut self, byte: u8) {
        if byte == b'\r' {
            return;
        }
        if self.shared.flags.paint_ok() {
            self.sink.stream(&[byte]);
        } else {
            self.stage(&[byte]);
        }
    }

    fn route_multi(&mut self, core: usize, byte: u8) {
        match self.lines[core].push(byte) {
            PushOutcome::Buffered => {}
            PushOutcome::Flush(line) => {
                if self.shared.flags.paint_ok() {
                    self.sink.line(core, &line);
                } else {
                    // Prefix at stage time so drained output is
                    // byte-identical to live output.
                    let mut staged = format!("[{core}]: ").into_bytes();
                    staged.extend_from_slice(&line);
                    self.stage(&staged);
                }
            }
            PushOutcome::Dropped { first } => {
                if first {
                    let message = format!(
                        "Warning, UART buffer length of {MAX_BUFFER_SIZE} bytes exceeded for core {core}, ignoring data '{}'",
                        byte as char
                    );
                    warn!(target: "uart.poll", core, "line_buffer_overflow");
                    if self.shared.flags.paint_ok() {
                        self.sink.warning(&message);
                    } else {
                        self.stage(format!("{message}\n").as_bytes());
                    }
                }
            }
        }
    }

    fn stage(&mut self, bytes: &[u8]) {
        if !self.pause.stage(bytes) {
            debug!(target: "uart.poll", len = bytes.len(), "pause_buffer_full_bytes_dropped");
        }
    }
}
