//! Immutable device and host-board description types.
//!
//! `DeviceConfiguration` is read once from the driver at startup and never
//! changes for the session lifetime. `HostBoardStatus` is a point-in-time
//! sample and only feeds the configuration report.

/// How the soft cores share (or split) their instruction and data memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchitectureType {
    SharedNothing,
    SharedInstrOnly,
    SharedDataOnly,
    SharedEverything,
}

impl ArchitectureType {
    /// True when all cores fetch from one instruction memory, meaning the
    /// executable only needs to be written once.
    pub fn has_shared_instructions(&self) -> bool {
        matches!(
            self,
            ArchitectureType::SharedInstrOnly | ArchitectureType::SharedEverything
        )
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ArchitectureType::SharedNothing => "Split instruction memory, split data memory",
            ArchitectureType::SharedInstrOnly => "Shared instruction memory, split data memory",
            ArchitectureType::SharedDataOnly => "Split instruction memory, shared data memory",
            ArchitectureType::SharedEverything => "Shared instruction memory, shared data memory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostBoardType {
    Pa100,
    Pa101,
    Unknown,
}

impl HostBoardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostBoardType::Pa100 => "PA100",
            HostBoardType::Pa101 => "PA101",
            HostBoardType::Unknown => "unknown",
        }
    }
}

/// Host FPGA board telemetry sampled on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct HostBoardStatus {
    pub board_type: HostBoardType,
    pub board_serial_number: i32,
    pub temperature_celsius: f32,
    pub power_draw_watts: f32,
    pub time_alive_secs: u64,
    pub num_power_cycles: u64,
}

/// Static description of the attached device, reported by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfiguration {
    pub device_name: String,
    pub cpu_name: String,
    pub number_cores: usize,
    pub clock_frequency_mhz: u32,
    pub pcie_bar_ctrl_window_index: u32,
    pub version: u8,
    pub revision: u32,
    pub architecture_type: ArchitectureType,
    pub instruction_space_size_mb: u32,
    pub per_core_data_space_mb: u32,
    pub shared_data_space_kb: u32,
    /// DDR bank index backing each core, `number_cores` entries.
    pub ddr_bank_mapping: Vec<u8>,
    /// Host-side base data address for each core, `number_cores` entries.
    pub ddr_base_addr_mapping: Vec<u64>,
}
