//! Device status codes surfaced as a typed error.
//!
//! Every driver entry point reports success or one of a closed set of
//! failure codes; `Ok(_)` carries the success case so callers compose with
//! `?`. A non-success code anywhere inside the session is treated as fatal
//! by the caller (the device is assumed wedged).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("device function failed")]
    Failed,
    #[error("device has not been initialised")]
    NotInitialised,
    #[error("core is already running")]
    AlreadyRunning,
    #[error("core is already stopped")]
    AlreadyStopped,
    #[error("operation not implemented by this device")]
    NotImplemented,
    #[error("unknown core {0}")]
    UnknownCore(usize),
}

impl DeviceError {
    /// Stable identifier used in structured logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceError::Failed => "failed",
            DeviceError::NotInitialised => "not_initialised",
            DeviceError::AlreadyRunning => "already_running",
            DeviceError::AlreadyStopped => "already_stopped",
            DeviceError::NotImplemented => "not_implemented",
            DeviceError::UnknownCore(_) => "unknown_core",
        }
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;
