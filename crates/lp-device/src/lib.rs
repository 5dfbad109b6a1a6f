//! Device driver contract for the soft-CPU accelerator.
//!
//! The driver is a fixed table of operations the rest of the tool consumes,
//! expressed as an object-safe trait. Backends implement the trait for one
//! board generation; the session only ever sees `dyn DeviceDriver` behind a
//! mutex because the underlying driver operations are not reentrant.
//!
//! The in-tree [`sim::SimulatedDevice`] backend implements the full contract
//! in software and is used for development without hardware and throughout
//! the test suites.

use crate::types::{DeviceConfiguration, HostBoardStatus};

pub mod error;
pub mod report;
pub mod sim;
pub mod types;

pub use error::{DeviceError, DeviceResult};
pub use types::{ArchitectureType, HostBoardType};

/// Operation table every device backend provides.
///
/// Calls are not reentrant: callers serialize access through one device
/// lock. Methods take `&mut self` to make that expectation explicit.
pub trait DeviceDriver: Send {
    fn initialise(&mut self) -> DeviceResult<()>;
    fn finalise(&mut self) -> DeviceResult<()>;
    fn reset(&mut self) -> DeviceResult<()>;

    fn configuration(&mut self) -> DeviceResult<DeviceConfiguration>;
    fn host_board_status(&mut self) -> DeviceResult<HostBoardStatus>;

    fn start_core(&mut self, core: usize) -> DeviceResult<()>;
    fn start_all_cores(&mut self) -> DeviceResult<()>;
    fn stop_core(&mut self, core: usize) -> DeviceResult<()>;
    fn stop_all_cores(&mut self) -> DeviceResult<()>;

    /// Write into the shared instruction space.
    fn write_instructions(&mut self, addr: u64, bytes: &[u8]) -> DeviceResult<()>;
    fn write_data(&mut self, addr: u64, bytes: &[u8]) -> DeviceResult<()>;
    fn read_data(&mut self, addr: u64, out: &mut [u8]) -> DeviceResult<()>;

    /// Write into one core's private instruction space.
    fn write_core_instructions(
        &mut self,
        core: usize,
        addr: u64,
        bytes: &[u8],
    ) -> DeviceResult<()>;
    fn write_core_data(&mut self, core: usize, addr: u64, bytes: &[u8]) -> DeviceResult<()>;
    fn read_core_data(&mut self, core: usize, addr: u64, out: &mut [u8]) -> DeviceResult<()>;

    fn read_gpio(&mut self, core: usize, pin: u32) -> DeviceResult<u8>;
    fn write_gpio(&mut self, core: usize, pin: u32, value: u8) -> DeviceResult<()>;

    fn uart_has_data(&mut self, core: usize) -> DeviceResult<bool>;
    fn read_uart(&mut self, core: usize) -> DeviceResult<u8>;
    fn write_uart(&mut self, core: usize, byte: u8) -> DeviceResult<()>;

    fn raise_interrupt(&mut self, core: usize, irq: u32) -> DeviceResult<()>;
}
