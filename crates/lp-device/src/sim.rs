//! Software device backend.
//!
//! Implements the full [`DeviceDriver`] contract in memory: per-core
//! instruction/data spaces, GPIO banks, and UART queues. Started cores emit
//! a boot line and echo host UART writes back, which makes the interactive
//! session usable end-to-end with no hardware attached (`--simulate`).
//!
//! Construction also returns a set of handles sharing the UART queues, so
//! tests and tooling can inject core-side output and inspect host-side
//! input out of band while the device itself sits behind the session's
//! device lock.

use crate::DeviceDriver;
use crate::error::{DeviceError, DeviceResult};
use crate::types::{
    ArchitectureType, DeviceConfiguration, HostBoardStatus, HostBoardType,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

const GPIO_PINS: usize = 8;
/// Upper bound on any simulated memory region; writes past it fail rather
/// than ballooning the host allocation.
const MEMORY_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct SimOptions {
    /// Emit a one-line boot message on each core start.
    pub boot_banner: bool,
    /// Echo host UART writes back on the core's output channel.
    pub echo: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            boot_banner: true,
            echo: true,
        }
    }
}

impl SimOptions {
    /// No banner, no echo. Tests drive the UART queues explicitly.
    pub fn quiet() -> Self {
        Self {
            boot_banner: false,
            echo: false,
        }
    }
}

type ByteQueue = Arc<Mutex<VecDeque<u8>>>;

/// Out-of-band access to one core's UART queues.
#[derive(Clone)]
pub struct SimUartHandle {
    to_host: ByteQueue,
    from_host: ByteQueue,
}

impl SimUartHandle {
    /// Inject bytes as if the core had written them to its UART.
    pub fn emit(&self, bytes: &[u8]) {
        let mut q = self.to_host.lock().expect("sim uart queue poisoned");
        q.extend(bytes.iter().copied());
    }

    /// Drain and return everything the host has written to this core.
    pub fn take_host_bytes(&self) -> Vec<u8> {
        let mut q = self.from_host.lock().expect("sim uart queue poisoned");
        q.drain(..).collect()
    }

    /// Bytes still queued towards the host (unread by the poller).
    pub fn pending_to_host(&self) -> usize {
        self.to_host.lock().expect("sim uart queue poisoned").len()
    }
}

/// Handles for every core of a [`SimulatedDevice`].
pub struct SimHandles {
    pub uarts: Vec<SimUartHandle>,
}

struct SimCore {
    running: bool,
    instructions: Vec<u8>,
    data: Vec<u8>,
    gpio: [u8; GPIO_PINS],
}

impl SimCore {
    fn new() -> Self {
        Self {
            running: false,
            instructions: Vec::new(),
            data: Vec::new(),
            gpio: [0; GPIO_PINS],
        }
    }
}

pub struct SimulatedDevice {
    options: SimOptions,
    config: DeviceConfiguration,
    initialised: bool,
    power_cycles: u64,
    brought_up: Instant,
    shared_instructions: Vec<u8>,
    shared_data: Vec<u8>,
    cores: Vec<SimCore>,
    to_host: Vec<ByteQueue>,
    from_host: Vec<ByteQueue>,
}

impl SimulatedDevice {
    /// A device with `number_cores` cores and the default split-everything
    /// architecture.
    pub fn new(number_cores: usize, options: SimOptions) -> (Self, SimHandles) {
        Self::with_configuration(default_configuration(number_cores), options)
    }

    pub fn with_configuration(
        config: DeviceConfiguration,
        options: SimOptions,
    ) -> (Self, SimHandles) {
        let n = config.number_cores;
        let to_host: Vec<ByteQueue> = (0..n).map(|_| Arc::default()).collect();
        let from_host: Vec<ByteQueue> = (0..n).map(|_| Arc::default()).collect();
        let handles = SimHandles {
            uarts: (0..n)
                .map(|i| SimUartHandle {
                    to_host: to_host[i].clone(),
                    from_host: from_host[i].clone(),
                })
                .collect(),
        };
        let device = Self {
            options,
            initialised: false,
            power_cycles: 0,
            brought_up: Instant::now(),
            shared_instructions: Vec::new(),
            shared_data: Vec::new(),
            cores: (0..n).map(|_| SimCore::new()).collect(),
            to_host,
            from_host,
            config,
        };
        (device, handles)
    }

    fn require_initialised(&self) -> DeviceResult<()> {
        if self.initialised {
            Ok(())
        } else {
            Err(DeviceError::NotInitialised)
        }
    }

    fn core_mut(&mut self, core: usize) -> DeviceResult<&mut SimCore> {
        self.cores.get_mut(core).ok_or(DeviceError::UnknownCore(core))
    }

    fn check_core(&self, core: usize) -> DeviceResult<()> {
        if core < self.cores.len() {
            Ok(())
        } else {
            Err(DeviceError::UnknownCore(core))
        }
    }

    fn push_to_host(&self, core: usize, bytes: &[u8]) {
        let mut q = self.to_host[core].lock().expect("sim uart queue poisoned");
        q.extend(bytes.iter().copied());
    }

    fn boot_core(&mut self, core: usize) {
        self.cores[core].running = true;
        if self.options.boot_banner {
            let banner = format!("core {core}: boot ok\n");
            self.push_to_host(core, banner.as_bytes());
        }
        debug!(target: "device.sim", core, "core_started");
    }
}

fn default_configuration(number_cores: usize) -> DeviceConfiguration {
    DeviceConfiguration {
        device_name: "simulated soft-CPU device".to_string(),
        cpu_name: "rv32 softcore".to_string(),
        number_cores,
        clock_frequency_mhz: 125,
        pcie_bar_ctrl_window_index: 0,
        version: 0xa,
        revision: 1,
        architecture_type: ArchitectureType::SharedNothing,
        instruction_space_size_mb: 4,
        per_core_data_space_mb: 16,
        shared_data_space_kb: 64,
        ddr_bank_mapping: (0..number_cores).map(|i| (i % 2) as u8).collect(),
        ddr_base_addr_mapping: (0..number_cores)
            .map(|i| 0x1000_0000 + (i as u64) * 0x0100_0000)
            .collect(),
    }
}

fn write_region(region: &mut Vec<u8>, addr: u64, bytes: &[u8]) -> DeviceResult<()> {
    let addr = addr as usize;
    let end = addr.checked_add(bytes.len()).ok_or(DeviceError::Failed)?;
    if end > MEMORY_LIMIT {
        return Err(DeviceError::Failed);
    }
    if region.len() < end {
        region.resize(end, 0);
    }
    region[addr..end].copy_from_slice(bytes);
    Ok(())
}

fn read_region(region: &[u8], addr: u64, out: &mut [u8]) -> DeviceResult<()> {
    let addr = addr as usize;
    addr.checked_add(out.len()).ok_or(DeviceError::Failed)?;
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = region.get(addr + i).copied().unwrap_or(0);
    }
    Ok(())
}

impl DeviceDriver for SimulatedDevice {
    fn initialise(&mut self) -> DeviceResult<()> {
        self.initialised = true;
        debug!(target: "device.sim", cores = self.cores.len(), "initialised");
        Ok(())
    }

    fn finalise(&mut self) -> DeviceResult<()> {
        self.initialised = false;
        Ok(())
    }

    fn reset(&mut self) -> DeviceResult<()> {
        for core in &mut self.cores {
            core.running = false;
            core.instructions.clear();
            core.data.clear();
            core.gpio = [0; GPIO_PINS];
        }
        self.shared_instructions.clear();
        self.shared_data.clear();
        for q in self.to_host.iter().chain(self.from_host.iter()) {
            q.lock().expect("sim uart queue poisoned").clear();
        }
        self.power_cycles += 1;
        self.initialised = false;
        debug!(target: "device.sim", "reset");
        Ok(())
    }

    fn configuration(&mut self) -> DeviceResult<DeviceConfiguration> {
        self.require_initialised()?;
        Ok(self.config.clone())
    }

    fn host_board_status(&mut self) -> DeviceResult<HostBoardStatus> {
        self.require_initialised()?;
        Ok(HostBoardStatus {
            board_type: HostBoardType::Pa100,
            board_serial_number: 4242,
            temperature_celsius: 41.5,
            power_draw_watts: 22.8,
            time_alive_secs: self.brought_up.elapsed().as_secs(),
            num_power_cycles: self.power_cycles,
        })
    }

    fn start_core(&mut self, core: usize) -> DeviceResult<()> {
        self.require_initialised()?;
        if self.core_mut(core)?.running {
            return Err(DeviceError::AlreadyRunning);
        }
        self.boot_core(core);
        Ok(())
    }

    fn start_all_cores(&mut self) -> DeviceResult<()> {
        self.require_initialised()?;
        if self.cores.iter().all(|c| c.running) {
            return Err(DeviceError::AlreadyRunning);
        }
        for core in 0..self.cores.len() {
            if !self.cores[core].running {
                self.boot_core(core);
            }
        }
        Ok(())
    }

    fn stop_core(&mut self, core: usize) -> DeviceResult<()> {
        self.require_initialised()?;
        let slot = self.core_mut(core)?;
        if !slot.running {
            return Err(DeviceError::AlreadyStopped);
        }
        slot.running = false;
        debug!(target: "device.sim", core, "core_stopped");
        Ok(())
    }

    fn stop_all_cores(&mut self) -> DeviceResult<()> {
        self.require_initialised()?;
        for core in &mut self.cores {
            core.running = false;
        }
        debug!(target: "device.sim", "all_cores_stopped");
        Ok(())
    }

    fn write_instructions(&mut self, addr: u64, bytes: &[u8]) -> DeviceResult<()> {
        self.require_initialised()?;
        if !self.config.architecture_type.has_shared_instructions() {
            return Err(DeviceError::NotImplemented);
        }
        write_region(&mut self.shared_instructions, addr, bytes)
    }

    fn write_data(&mut self, addr: u64, bytes: &[u8]) -> DeviceResult<()> {
        self.require_initialised()?;
        write_region(&mut self.shared_data, addr, bytes)
    }

    fn read_data(&mut self, addr: u64, out: &mut [u8]) -> DeviceResult<()> {
        self.require_initialised()?;
        read_region(&self.shared_data, addr, out)
    }

    fn write_core_instructions(
        &mut self,
        core: usize,
        addr: u64,
        bytes: &[u8],
    ) -> DeviceResult<()> {
        self.require_initialised()?;
        if self.config.architecture_type.has_shared_instructions() {
            return Err(DeviceError::NotImplemented);
        }
        let slot = self.core_mut(core)?;
        write_region(&mut slot.instructions, addr, bytes)
    }

    fn write_core_data(&mut self, core: usize, addr: u64, bytes: &[u8]) -> DeviceResult<()> {
        self.require_initialised()?;
        let slot = self.core_mut(core)?;
        write_region(&mut slot.data, addr, bytes)
    }

    fn read_core_data(&mut self, core: usize, addr: u64, out: &mut [u8]) -> DeviceResult<()> {
        self.require_initialised()?;
        self.check_core(core)?;
        read_region(&self.cores[core].data, addr, out)
    }

    fn read_gpio(&mut self, core: usize, pin: u32) -> DeviceResult<u8> {
        self.require_initialised()?;
        let slot = self.core_mut(core)?;
        slot.gpio
            .get(pin as usize)
            .copied()
            .ok_or(DeviceError::Failed)
    }

    fn write_gpio(&mut self, core: usize, pin: u32, value: u8) -> DeviceResult<()> {
        self.require_initialised()?;
        let slot = self.core_mut(core)?;
        match slot.gpio.get_mut(pin as usize) {
            Some(p) => {
                *p = value;
                Ok(())
            }
            None => Err(DeviceError::Failed),
        }
    }

    fn uart_has_data(&mut self, core: usize) -> DeviceResult<bool> {
        self.require_initialised()?;
        self.check_core(core)?;
        let q = self.to_host[core].lock().expect("sim uart queue poisoned");
        Ok(!q.is_empty())
    }

    fn read_uart(&mut self, core: usize) -> DeviceResult<u8> {
        self.require_initialised()?;
        self.check_core(core)?;
        let mut q = self.to_host[core].lock().expect("sim uart queue poisoned");
        q.pop_front().ok_or(DeviceError::Failed)
    }

    fn write_uart(&mut self, core: usize, byte: u8) -> DeviceResult<()> {
        self.require_initialised()?;
        self.check_core(core)?;
        {
            let mut q = self.from_host[core].lock().expect("sim uart queue poisoned");
            q.push_back(byte);
        }
        if self.options.echo && self.cores[core].running {
            self.push_to_host(core, &[byte]);
        }
        Ok(())
    }

    fn raise_interrupt(&mut self, core: usize, irq: u32) -> DeviceResult<()> {
        self.require_initialised()?;
        self.check_core(core)?;
        debug!(target: "device.sim", core, irq, "interrupt_raised");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_device(cores: usize) -> (SimulatedDevice, SimHandles) {
        let (mut device, handles) = SimulatedDevice::new(cores, SimOptions::quiet());
        device.initialise().unwrap();
        (device, handles)
    }

    #[test]
    fn operations_require_initialise() {
        let (mut device, _h) = SimulatedDevice::new(2, SimOptions::quiet());
        assert_eq!(device.configuration(), Err(DeviceError::NotInitialised));
        assert_eq!(device.start_core(0), Err(DeviceError::NotInitialised));
        device.initialise().unwrap();
        assert!(device.configuration().is_ok());
    }

    #[test]
    fn start_twice_reports_already_running() {
        let (mut device, _h) = ready_device(2);
        device.start_core(1).unwrap();
        assert_eq!(device.start_core(1), Err(DeviceError::AlreadyRunning));
        device.stop_core(1).unwrap();
        assert_eq!(device.stop_core(1), Err(DeviceError::AlreadyStopped));
    }

    #[test]
    fn unknown_core_rejected() {
        let (mut device, _h) = ready_device(2);
        assert_eq!(device.start_core(2), Err(DeviceError::UnknownCore(2)));
        assert_eq!(device.read_uart(9), Err(DeviceError::UnknownCore(9)));
    }

    #[test]
    fn uart_round_trip_via_handles() {
        let (mut device, handles) = ready_device(1);
        assert!(!device.uart_has_data(0).unwrap());
        handles.uarts[0].emit(b"hi");
        assert!(device.uart_has_data(0).unwrap());
        assert_eq!(device.read_uart(0).unwrap(), b'h');
        assert_eq!(device.read_uart(0).unwrap(), b'i');
        assert_eq!(device.read_uart(0), Err(DeviceError::Failed));

        device.write_uart(0, b'x').unwrap();
        assert_eq!(handles.uarts[0].take_host_bytes(), b"x");
    }

    #[test]
    fn echo_only_while_core_runs() {
        let (mut device, handles) =
            SimulatedDevice::new(1, SimOptions { boot_banner: false, echo: true });
        device.initialise().unwrap();
        device.write_uart(0, b'a').unwrap();
        assert_eq!(handles.uarts[0].pending_to_host(), 0);
        device.start_core(0).unwrap();
        device.write_uart(0, b'b').unwrap();
        assert_eq!(handles.uarts[0].pending_to_host(), 1);
    }

    #[test]
    fn boot_banner_lands_on_uart() {
        let (mut device, _h) = SimulatedDevice::new(1, SimOptions::default());
        device.initialise().unwrap();
        device.start_core(0).unwrap();
        let mut line = Vec::new();
        while device.uart_has_data(0).unwrap() {
            line.push(device.read_uart(0).unwrap());
        }
        assert_eq!(line, b"core 0: boot ok\n");
    }

    #[test]
    fn instruction_space_follows_architecture() {
        let (mut device, _h) = ready_device(2);
        // Default architecture has split instruction memories.
        assert_eq!(
            device.write_instructions(0, b"code"),
            Err(DeviceError::NotImplemented)
        );
        device.write_core_instructions(0, 0, b"code").unwrap();

        let mut config = default_configuration(2);
        config.architecture_type = ArchitectureType::SharedEverything;
        let (mut shared, _h) = SimulatedDevice::with_configuration(config, SimOptions::quiet());
        shared.initialise().unwrap();
        shared.write_instructions(0, b"code").unwrap();
        assert_eq!(
            shared.write_core_instructions(0, 0, b"code"),
            Err(DeviceError::NotImplemented)
        );
    }

    #[test]
    fn data_read_back_and_reset_clears() {
        let (mut device, _h) = ready_device(1);
        device.write_core_data(0, 8, &[1, 2, 3]).unwrap();
        let mut out = [0u8; 3];
        device.read_core_data(0, 8, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3]);

        device.reset().unwrap();
        assert_eq!(device.read_uart(0), Err(DeviceError::NotInitialised));
        device.initialise().unwrap();
        let status = device.host_board_status().unwrap();
        assert_eq!(status.num_power_cycles, 1);
        let mut out = [9u8; 3];
        device.read_core_data(0, 8, &mut out).unwrap();
        assert_eq!(out, [0, 0, 0]);
    }

    #[test]
    fn gpio_pins_bounded() {
        let (mut device, _h) = ready_device(1);
        device.write_gpio(0, 3, 0xff).unwrap();
        assert_eq!(device.read_gpio(0, 3).unwrap(), 0xff);
        assert_eq!(device.read_gpio(0, 64), Err(DeviceError::Failed));
    }
}
