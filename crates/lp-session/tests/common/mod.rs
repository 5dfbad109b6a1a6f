#![allow(dead_code)] // Shared across the integration suites; each binary uses a subset.

use lp_config::LaunchpadConfig;
use lp_device::DeviceDriver;
use lp_device::sim::{SimHandles, SimOptions, SimulatedDevice};
use lp_session::paint::{PaintSink, SessionPaint};
use lp_session::poller::UartPoller;
use lp_session::state::SessionShared;
use std::sync::{Arc, Mutex};

/// Recording painter usable as both the poller sink and the command
/// processor surface. Clones share the log.
#[derive(Clone, Default)]
pub struct CapturePaint {
    log: Arc<Mutex<PaintLog>>,
}

#[derive(Default)]
pub struct PaintLog {
    pub stream: Vec<u8>,
    pub warnings: Vec<String>,
    pub panels: Vec<String>,
    pub notices: Vec<String>,
    pub errors: Vec<String>,
    pub waits: Vec<String>,
    pub cleared: usize,
}

impl CapturePaint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream_string(&self) -> String {
        String::from_utf8_lossy(&self.log.lock().unwrap().stream).into_owned()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.log.lock().unwrap().warnings.clone()
    }

    pub fn panels(&self) -> Vec<String> {
        self.log.lock().unwrap().panels.clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.log.lock().unwrap().notices.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.log.lock().unwrap().errors.clone()
    }

    pub fn waits(&self) -> Vec<String> {
        self.log.lock().unwrap().waits.clone()
    }

    pub fn cleared(&self) -> usize {
        self.log.lock().unwrap().cleared
    }

    pub fn last_error(&self) -> String {
        self.errors().last().cloned().unwrap_or_default()
    }
}

impl PaintSink for CapturePaint {
    fn stream(&mut self, bytes: &[u8]) {
        self.log.lock().unwrap().stream.extend_from_slice(bytes);
    }

    fn line(&mut self, core: usize, line: &[u8]) {
        let mut log = self.log.lock().unwrap();
        log.stream.extend_from_slice(format!("[{core}]: ").as_bytes());
        log.stream.extend_from_slice(line);
    }

    fn warning(&mut self, message: &str) {
        self.log.lock().unwrap().warnings.push(message.to_string());
    }
}

impl SessionPaint for CapturePaint {
    fn panel(&mut self, text: &str) {
        self.log.lock().unwrap().panels.push(text.to_string());
    }

    fn notice(&mut self, message: &str) {
        self.log.lock().unwrap().notices.push(message.to_string());
    }

    fn error_line(&mut self, message: &str) {
        self.log.lock().unwrap().errors.push(message.to_string());
    }

    fn wait_line(&mut self, message: &str) {
        self.log.lock().unwrap().waits.push(message.to_string());
    }

    fn clear_screen(&mut self) {
        self.log.lock().unwrap().cleared += 1;
    }
}

/// Initialised simulated device wrapped in session state, with the given
/// cores pre-enabled. The sim is quiet (no banner, no echo) so the tests
/// fully own the UART traffic.
pub fn session_fixture(cores: usize, enabled: &[usize]) -> (Arc<SessionShared>, SimHandles) {
    let (mut device, handles) = SimulatedDevice::new(cores, SimOptions::quiet());
    device.initialise().unwrap();
    let device_config = device.configuration().unwrap();
    let config = LaunchpadConfig {
        executable_path: None,
        enabled: enabled.iter().copied().collect(),
        all_cores: false,
    };
    let shared = Arc::new(SessionShared::new(Box::new(device), device_config, config));
    (shared, handles)
}

pub fn capture_poller(shared: &Arc<SessionShared>) -> (UartPoller<CapturePaint>, CapturePaint) {
    let capture = CapturePaint::new();
    (UartPoller::new(shared.clone(), capture.clone()), capture)
}

/// Run poll passes until two consecutive sweeps read nothing, giving the
/// drain gate one extra opportunity after traffic stops.
pub fn pump(poller: &mut UartPoller<CapturePaint>) {
    let mut idle = 0;
    while idle < 2 {
        if poller.poll_pass().expect("poll pass failed") {
            idle = 0;
        } else {
            idle += 1;
        }
    }
}
