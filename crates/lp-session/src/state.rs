//! State shared between the session controller and the UART poller.
//!
//! Three kinds of sharing, each with its own discipline:
//! * driver calls are serialized by the device mutex (the driver is not
//!   reentrant);
//! * the pause/paint/poll signals are independent atomics, each written by
//!   one side and read by the other (acquire/release is sufficient);
//! * `LaunchpadConfig` and the active-core set are only mutated by the
//!   controller, and only while `running == false`.

use lp_config::{CoreSet, LaunchpadConfig};
use lp_device::DeviceDriver;
use lp_device::types::DeviceConfiguration;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime view of the device, distinct from operator intent.
#[derive(Default)]
pub struct DeviceStatus {
    initialised: AtomicBool,
    running: AtomicBool,
    cores_active: Mutex<CoreSet>,
}

impl DeviceStatus {
    /// True after a successful driver `initialise`.
    pub fn initialised(&self) -> bool {
        self.initialised.load(Ordering::Acquire)
    }

    pub fn set_initialised(&self, value: bool) {
        self.initialised.store(value, Ordering::Release);
    }

    /// True iff a start has been issued since the last stop/reset.
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::Release);
    }

    pub fn cores_active(&self) -> CoreSet {
        *self.cores_active.lock().expect("cores_active poisoned")
    }

    pub fn set_cores_active(&self, set: CoreSet) {
        *self.cores_active.lock().expect("cores_active poisoned") = set;
    }

    pub fn clear_cores_active(&self) {
        self.set_cores_active(CoreSet::EMPTY);
    }
}

/// The signal set mediating the two workers. The three output signals are
/// deliberately separate booleans with distinct lifetimes; collapsing them
/// into one mode enum is how stale buffered output ends up spilling across
/// a stop.
pub struct SessionFlags {
    /// Foreground permits painting of the main output region.
    paint_ok: AtomicBool,
    /// Poller may issue driver UART reads.
    poll_enabled: AtomicBool,
    /// Staged pause-buffer contents are stale and must be dropped at the
    /// next drain opportunity.
    discard_paused_output: AtomicBool,
    /// Process-wide latch: every worker winds down at its next check.
    shutdown: AtomicBool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            paint_ok: AtomicBool::new(true),
            poll_enabled: AtomicBool::new(true),
            discard_paused_output: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        }
    }
}

impl SessionFlags {
    pub fn paint_ok(&self) -> bool {
        self.paint_ok.load(Ordering::Acquire)
    }

    pub fn set_paint_ok(&self, value: bool) {
        self.paint_ok.store(value, Ordering::Release);
    }

    pub fn poll_enabled(&self) -> bool {
        self.poll_enabled.load(Ordering::Acquire)
    }

    pub fn set_poll_enabled(&self, value: bool) {
        self.poll_enabled.store(value, Ordering::Release);
    }

    pub fn discard_paused_output(&self) -> bool {
        self.discard_paused_output.load(Ordering::Acquire)
    }

    pub fn set_discard_paused_output(&self, value: bool) {
        self.discard_paused_output.store(value, Ordering::Release);
    }

    pub fn shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn trip_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

/// Everything both workers need, behind one `Arc`.
pub struct SessionShared {
    pub device: Mutex<Box<dyn DeviceDriver>>,
    pub device_config: DeviceConfiguration,
    pub config: Mutex<LaunchpadConfig>,
    pub status: DeviceStatus,
    pub flags: SessionFlags,
}

impl SessionShared {
    pub fn new(
        device: Box<dyn DeviceDriver>,
        device_config: DeviceConfiguration,
        config: LaunchpadConfig,
    ) -> Self {
        Self {
            device: Mutex::new(device),
            device_config,
            config: Mutex::new(config),
            status: DeviceStatus::default(),
            flags: SessionFlags::default(),
        }
    }

    /// Enabled cores the device can address, snapshotted under the config
    /// lock.
    pub fn enabled_on_device(&self) -> CoreSet {
        self.config
            .lock()
            .expect("config poisoned")
            .enabled_on_device(self.device_config.number_cores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_defaults() {
        let flags = SessionFlags::default();
        assert!(flags.paint_ok());
        assert!(flags.poll_enabled());
        assert!(!flags.discard_paused_output());
        assert!(!flags.shutdown());
    }

    #[test]
    fn shutdown_latch_is_sticky() {
        let flags = SessionFlags::default();
        flags.trip_shutdown();
        assert!(flags.shutdown());
    }

    #[test]
    fn status_tracks_active_set() {
        let status = DeviceStatus::default();
        assert!(!status.initialised());
        status.set_initialised(true);
        assert!(status.initialised());
        assert!(!status.running());
        status.set_running(true);
        status.set_cores_active(CoreSet::first_n(3));
        assert_eq!(status.cores_active().count(), 3);
        status.clear_cores_active();
        assert!(status.cores_active().is_empty());
    }
}
