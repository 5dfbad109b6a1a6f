//! Human-readable device configuration report.
//!
//! Composed as a plain string so callers decide where it goes: stdout for
//! the one-shot `--config` mode, the session's panel painter for `:config`.

use crate::DeviceDriver;
use crate::error::DeviceResult;
use crate::types::DeviceConfiguration;
use std::fmt::Write;

/// Build the configuration report, sampling live board telemetry from the
/// driver. The caller holds the device lock.
pub fn device_report(
    driver: &mut dyn DeviceDriver,
    config: &DeviceConfiguration,
) -> DeviceResult<String> {
    let board = driver.host_board_status()?;

    let mut out = String::with_capacity(1024);
    let _ = writeln!(
        out,
        "Device: '{}', version {:x} revision {}",
        config.device_name, config.version, config.revision
    );
    let _ = writeln!(
        out,
        "CPU configuration: {} cores of {}",
        config.number_cores, config.cpu_name
    );
    let _ = writeln!(
        out,
        "Architecture type: {}",
        config.architecture_type.describe()
    );
    let _ = writeln!(out, "Clock frequency: {}MHz", config.clock_frequency_mhz);
    let _ = writeln!(
        out,
        "PCIe control BAR window: {}",
        config.pcie_bar_ctrl_window_index
    );
    let _ = writeln!(
        out,
        "Memory configuration: {}MB instruction, {}MB data per core, {}KB shared data",
        config.instruction_space_size_mb,
        config.per_core_data_space_mb,
        config.shared_data_space_kb
    );

    let mut ddr_inuse = [false; 2];
    for core in 0..config.number_cores {
        if let Some(&bank) = config.ddr_bank_mapping.get(core) {
            if let Some(flag) = ddr_inuse.get_mut(bank as usize) {
                *flag = true;
            }
        }
    }
    let _ = writeln!(
        out,
        "\nDDR bank 0 in use: {}, DDR bank 1 in use: {}",
        if ddr_inuse[0] { "yes" } else { "no" },
        if ddr_inuse[1] { "yes" } else { "no" }
    );
    for core in 0..config.number_cores {
        let bank = config.ddr_bank_mapping.get(core).copied().unwrap_or(0);
        let base = config.ddr_base_addr_mapping.get(core).copied().unwrap_or(0);
        let _ = writeln!(
            out,
            "Core {core}: DDR bank {bank}, host-side base data address {base:#x}"
        );
    }

    let _ = writeln!(
        out,
        "\nHost FPGA board type is {}, serial number {}",
        board.board_type.as_str(),
        board.board_serial_number
    );
    let _ = writeln!(
        out,
        "FPGA temperature {:.2} C, power draw {:.2} Watts",
        board.temperature_celsius, board.power_draw_watts
    );
    let _ = writeln!(
        out,
        "FPGA has had {} power cycles, with a total alive time of {}",
        board.num_power_cycles,
        format_uptime(board.time_alive_secs)
    );
    Ok(out)
}

/// Break an uptime in seconds into the largest units worth showing.
pub fn format_uptime(seconds: u64) -> String {
    const YEAR: u64 = 31_536_000;
    const DAY: u64 = 86_400;
    let years = seconds / YEAR;
    let mut rem = seconds % YEAR;
    let days = rem / DAY;
    rem %= DAY;
    let hours = rem / 3600;
    rem %= 3600;
    let mins = rem / 60;
    let secs = rem % 60;
    if years > 0 {
        format!("{years} years, {days} days, {hours} hours, {mins} min and {secs} secs")
    } else if days > 0 {
        format!("{days} days, {hours} hours, {mins} min and {secs} secs")
    } else {
        format!("{hours} hours, {mins} min and {secs} secs")
    }
}
