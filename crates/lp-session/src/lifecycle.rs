//! Core lifecycle helpers: image distribution and bulk start.
//!
//! Callers hold the device lock across a whole sequence; these helpers
//! never paint and never touch session status, they only talk to the
//! driver.

use lp_config::CoreSet;
use lp_device::error::DeviceResult;
use lp_device::types::DeviceConfiguration;
use lp_device::{DeviceDriver, DeviceError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("error reading executable file '{}', check it exists", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Read the executable image and write it to the device: once into the
/// shared instruction space, or into each enabled core's private
/// instruction space when instruction memory is split. Returns the image
/// size in bytes.
pub fn load_and_distribute(
    device: &mut dyn DeviceDriver,
    device_config: &DeviceConfiguration,
    enabled: CoreSet,
    path: &Path,
) -> Result<u64, LifecycleError> {
    let image = fs::read(path).map_err(|source| LifecycleError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    if device_config.architecture_type.has_shared_instructions() {
        device.write_instructions(0, &image)?;
    } else {
        for core in enabled.on_device(device_config.number_cores).iter() {
            device.write_core_instructions(core, 0, &image)?;
        }
    }
    info!(
        target: "session.lifecycle",
        image = %path.display(),
        size_bytes = image.len(),
        shared = device_config.architecture_type.has_shared_instructions(),
        "image_distributed"
    );
    Ok(image.len() as u64)
}

/// Start every enabled core, using the bulk path when the whole device is
/// selected. Returns the number of cores started.
pub fn start_enabled_cores(
    device: &mut dyn DeviceDriver,
    device_config: &DeviceConfiguration,
    enabled: CoreSet,
) -> DeviceResult<usize> {
    let on_device = enabled.on_device(device_config.number_cores);
    if on_device.count() == device_config.number_cores {
        device.start_all_cores()?;
        debug!(target: "session.lifecycle", count = device_config.number_cores, "bulk_start");
        Ok(device_config.number_cores)
    } else {
        let mut started = 0;
        for core in on_device.iter() {
            device.start_core(core)?;
            started += 1;
        }
        debug!(target: "session.lifecycle", count = started, "per_core_start");
        Ok(started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lp_device::sim::{SimOptions, SimulatedDevice};
    use lp_device::types::ArchitectureType;
    use std::io::Write;

    fn image_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f
    }

    #[test]
    fn split_architecture_writes_each_enabled_core() {
        let (mut device, _h) = SimulatedDevice::new(4, SimOptions::quiet());
        device.initialise().unwrap();
        let config = device.configuration().unwrap();
        let image = image_file(b"\x13\x00\x00\x00");
        let enabled: CoreSet = [0, 2].into_iter().collect();
        let size =
            load_and_distribute(&mut device, &config, enabled, image.path()).unwrap();
        assert_eq!(size, 4);
        let mut out = [0u8; 4];
        // Data space is untouched; instruction spaces are not readable via
        // the contract, so success of the split write path is the signal.
        device.read_core_data(0, 0, &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 0]);
    }

    #[test]
    fn shared_architecture_writes_once() {
        let mut config = {
            let (mut d, _h) = SimulatedDevice::new(2, SimOptions::quiet());
            d.initialise().unwrap();
            d.configuration().unwrap()
        };
        config.architecture_type = ArchitectureType::SharedInstrOnly;
        let (mut device, _h) = SimulatedDevice::with_configuration(config.clone(), SimOptions::quiet());
        device.initialise().unwrap();
        let image = image_file(b"code");
        load_and_distribute(&mut device, &config, CoreSet::first_n(2), image.path()).unwrap();
    }

    #[test]
    fn missing_image_is_an_image_error() {
        let (mut device, _h) = SimulatedDevice::new(1, SimOptions::quiet());
        device.initialise().unwrap();
        let config = device.configuration().unwrap();
        let err = load_and_distribute(
            &mut device,
            &config,
            CoreSet::single(0),
            Path::new("__no_such_image__.bin"),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::Image { .. }));
    }

    #[test]
    fn full_selection_uses_bulk_start() {
        let (mut device, handles) = SimulatedDevice::new(2, SimOptions::default());
        device.initialise().unwrap();
        let config = device.configuration().unwrap();
        let started = start_enabled_cores(&mut device, &config, CoreSet::first_n(2)).unwrap();
        assert_eq!(started, 2);
        // Both cores booted, so both emitted their banner.
        assert!(handles.uarts[0].pending_to_host() > 0);
        assert!(handles.uarts[1].pending_to_host() > 0);
    }

    #[test]
    fn partial_selection_starts_only_named_cores() {
        let (mut device, handles) = SimulatedDevice::new(3, SimOptions::default());
        device.initialise().unwrap();
        let config = device.configuration().unwrap();
        let started =
            start_enabled_cores(&mut device, &config, CoreSet::single(1)).unwrap();
        assert_eq!(started, 1);
        assert_eq!(handles.uarts[0].pending_to_host(), 0);
        assert!(handles.uarts[1].pending_to_host() > 0);
        assert_eq!(handles.uarts[2].pending_to_host(), 0);
    }

    #[test]
    fn out_of_range_selection_is_clamped() {
        let (mut device, _h) = SimulatedDevice::new(2, SimOptions::quiet());
        device.initialise().unwrap();
        let config = device.configuration().unwrap();
        let enabled: CoreSet = [1, 9].into_iter().collect();
        let started = start_enabled_cores(&mut device, &config, enabled).unwrap();
        assert_eq!(started, 1);
    }
}
