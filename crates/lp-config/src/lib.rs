//! Launchpad user intent: which cores run which executable.
//!
//! `LaunchpadConfig` is the operator-facing half of the state: the
//! executable image path and the enabled-core selection, assembled from
//! `launchpad.toml` defaults plus command line arguments, and mutated at
//! runtime only through session commands while the cores are stopped.

use std::path::PathBuf;
use tracing::warn;

pub mod core_set;
pub mod file;
pub mod spec;

pub use core_set::CoreSet;
pub use file::{FileDefaults, SessionDefaults};
pub use spec::{CoreSpec, SpecError, parse_core_spec};

/// Hard ceiling on addressable cores; device core counts are always lower.
pub const MAX_CORES: usize = 128;

#[derive(Debug, Clone, Default)]
pub struct LaunchpadConfig {
    pub executable_path: Option<PathBuf>,
    pub enabled: CoreSet,
    /// Sticky "follow the device core count" flag set by `all` specs.
    pub all_cores: bool,
}

impl LaunchpadConfig {
    /// Replace the selection with a freshly parsed spec.
    pub fn set_cores(&mut self, spec: CoreSpec) {
        match spec {
            CoreSpec::All => {
                self.all_cores = true;
                self.enabled = CoreSet::EMPTY;
            }
            CoreSpec::Set(set) => {
                self.all_cores = false;
                self.enabled = set;
            }
        }
    }

    /// Union a parsed spec into the current selection.
    pub fn enable_cores(&mut self, spec: CoreSpec) {
        match spec {
            CoreSpec::All => self.all_cores = true,
            CoreSpec::Set(set) => self.enabled = self.enabled.union(set),
        }
    }

    /// Remove a parsed spec from the current selection. An `all` spec
    /// clears everything, including the sticky flag.
    pub fn disable_cores(&mut self, spec: CoreSpec) {
        match spec {
            CoreSpec::All => {
                self.all_cores = false;
                self.enabled = CoreSet::EMPTY;
            }
            CoreSpec::Set(set) => self.enabled = self.enabled.subtract(set),
        }
    }

    /// Resolve the sticky all-cores flag once the device core count is
    /// known. Idempotent; called again after `:reset`.
    pub fn expand_all_cores(&mut self, number_cores: usize) {
        if self.all_cores {
            self.enabled = self.enabled.union(CoreSet::first_n(number_cores));
        }
    }

    /// Enabled cores the device can actually address.
    pub fn enabled_on_device(&self, number_cores: usize) -> CoreSet {
        self.enabled.on_device(number_cores)
    }

    /// Log and return the enabled indices the device cannot address.
    pub fn warn_unaddressable(&self, number_cores: usize) -> Vec<usize> {
        let beyond: Vec<usize> = self.enabled.beyond_device(number_cores).iter().collect();
        for core in &beyond {
            warn!(
                target: "config",
                core,
                number_cores,
                "enabled_core_beyond_device"
            );
        }
        beyond
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(indices: &[usize]) -> CoreSpec {
        CoreSpec::Set(indices.iter().copied().collect())
    }

    #[test]
    fn set_cores_replaces() {
        let mut config = LaunchpadConfig::default();
        config.set_cores(set(&[0, 1]));
        config.set_cores(set(&[5]));
        assert_eq!(config.enabled.iter().collect::<Vec<_>>(), vec![5]);
        assert!(!config.all_cores);
    }

    #[test]
    fn enable_cores_is_additive() {
        let mut config = LaunchpadConfig::default();
        config.set_cores(set(&[0, 1]));
        config.enable_cores(set(&[3]));
        assert_eq!(config.enabled.iter().collect::<Vec<_>>(), vec![0, 1, 3]);
    }

    #[test]
    fn disable_cores_subtracts() {
        let mut config = LaunchpadConfig::default();
        config.set_cores(set(&[0, 1, 3]));
        config.disable_cores(set(&[1, 7]));
        assert_eq!(config.enabled.iter().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn all_flag_expands_lazily() {
        let mut config = LaunchpadConfig::default();
        config.set_cores(CoreSpec::All);
        assert!(config.enabled.is_empty());
        config.expand_all_cores(4);
        assert_eq!(config.enabled.count(), 4);
        // A later reset against the same device changes nothing.
        config.expand_all_cores(4);
        assert_eq!(config.enabled.count(), 4);
    }

    #[test]
    fn unaddressable_cores_reported_but_kept() {
        let mut config = LaunchpadConfig::default();
        config.set_cores(set(&[0, 9]));
        assert_eq!(config.warn_unaddressable(4), vec![9]);
        assert_eq!(
            config.enabled_on_device(4).iter().collect::<Vec<_>>(),
            vec![0]
        );
        // Still present in the structure for a future larger device.
        assert!(config.enabled.contains(9));
    }
}
