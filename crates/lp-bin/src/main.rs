//! Launchpad entrypoint.
//!
//! Startup sequence: logging to `launchpad.log` (the terminal belongs to
//! the session), configuration defaults merged with the command line,
//! device bring-up, optional one-shot reset/report modes, optional
//! pre-session load-and-start, then the interactive UART session behind an
//! RAII terminal guard.

use anyhow::{Context, Result, bail};
use clap::Parser;
use lp_config::{FileDefaults, LaunchpadConfig, parse_core_spec};
use lp_device::DeviceDriver;
use lp_device::report::device_report;
use lp_device::sim::{SimOptions, SimulatedDevice};
use lp_session::{SessionShared, SessionTerminal, lifecycle, run_session};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// Core count presented by the simulated device backend.
const SIM_CORES: usize = 4;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "launchpad",
    version,
    about = "Host-side control and interactive UART console for a multi-core soft-CPU accelerator"
)]
struct Args {
    /// Binary executable image to load onto the enabled cores.
    #[arg(long = "exe", visible_alias = "bin", value_name = "PATH")]
    executable: Option<PathBuf>,
    /// Initial enabled cores: a single id, `all`, a range `a:b` or a list `a,b,c`.
    #[arg(short = 'c', long = "cores", value_name = "SPEC")]
    cores: Option<String>,
    /// Reset the device before initialising.
    #[arg(long)]
    reset: bool,
    /// Print the device configuration report; exits unless an executable is supplied.
    #[arg(long)]
    config: bool,
    /// Use the in-process simulated device instead of attached hardware.
    #[arg(long)]
    simulate: bool,
    /// Explicit `launchpad.toml` path, overriding discovery.
    #[arg(long = "defaults", value_name = "PATH")]
    defaults: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let defaults = lp_config::file::load_from(args.defaults.clone());
    let mut config = build_config(&args, &defaults)?;

    let mut device = open_device(&args)?;
    if args.reset {
        device.reset().context("error calling device function")?;
        info!(target: "runtime", "device_reset");
    }
    device.initialise().context("error calling device function")?;
    let device_config = device
        .configuration()
        .context("error calling device function")?;
    info!(
        target: "runtime",
        device = device_config.device_name.as_str(),
        cores = device_config.number_cores,
        "device_initialised"
    );

    config.expand_all_cores(device_config.number_cores);
    let beyond: Vec<usize> = config
        .enabled
        .beyond_device(device_config.number_cores)
        .iter()
        .collect();
    if !beyond.is_empty() {
        bail!(
            "core(s) {beyond:?} configured to be active but the device only has {} cores",
            device_config.number_cores
        );
    }

    if args.config {
        let report = device_report(device.as_mut(), &device_config)
            .context("error calling device function")?;
        println!("{report}");
        if config.executable_path.is_none() {
            return Ok(());
        }
    }

    let shared = Arc::new(SessionShared::new(device, device_config, config));
    shared.status.set_initialised(true);
    start_configured_cores(&shared)?;
    run_interactive(shared).await
}

/// Merge `launchpad.toml` defaults with the command line (which wins) and
/// validate what can be validated before touching the device.
fn build_config(args: &Args, defaults: &FileDefaults) -> Result<LaunchpadConfig> {
    let mut config = LaunchpadConfig::default();
    if let Some(spec) = args.cores.as_deref().or(defaults.session.cores.as_deref()) {
        let spec = parse_core_spec(spec)
            .with_context(|| format!("invalid core specification '{spec}'"))?;
        config.set_cores(spec);
    }
    config.executable_path = args
        .executable
        .clone()
        .or_else(|| defaults.session.executable.clone());
    if let Some(path) = &config.executable_path {
        if !path.exists() {
            bail!(
                "error opening executable file '{}', check it exists",
                path.display()
            );
        }
    }
    Ok(config)
}

fn open_device(args: &Args) -> Result<Box<dyn DeviceDriver>> {
    if args.simulate {
        let (device, _handles) = SimulatedDevice::new(SIM_CORES, SimOptions::default());
        info!(target: "runtime", backend = "sim", cores = SIM_CORES, "device_opened");
        return Ok(Box::new(device));
    }
    // Hardware backends implement `DeviceDriver` and slot in here; none is
    // linked into this build.
    bail!("no hardware device backend is linked into this build, rerun with --simulate")
}

/// Load and start before entering the session when the command line already
/// names an executable and at least one addressable core. Otherwise the
/// session starts idle and the operator uses `:exe` / `:e` / `:start`.
fn start_configured_cores(shared: &SessionShared) -> Result<()> {
    let (enabled, executable) = {
        let config = shared.config.lock().expect("config poisoned");
        (
            config.enabled_on_device(shared.device_config.number_cores),
            config.executable_path.clone(),
        )
    };
    let Some(executable) = executable else {
        return Ok(());
    };
    if enabled.is_empty() {
        return Ok(());
    }

    let mut device = shared.device.lock().expect("device lock poisoned");
    lifecycle::load_and_distribute(
        device.as_mut(),
        &shared.device_config,
        enabled,
        &executable,
    )
    .context("failed to transfer executable to device")?;
    let started = lifecycle::start_enabled_cores(device.as_mut(), &shared.device_config, enabled)
        .context("error calling device function")?;
    drop(device);

    shared.status.set_cores_active(enabled);
    shared.status.set_running(true);
    info!(target: "runtime", started, "cores_started");
    Ok(())
}

async fn run_interactive(shared: Arc<SessionShared>) -> Result<()> {
    let mut backend = SessionTerminal::new();
    let result = {
        let _guard = backend.enter_guard()?;
        run_session(shared).await
        // Guard drops here: terminal restored before any diagnostic.
    };
    match result {
        Ok(()) => {
            info!(target: "runtime", "shutdown");
            Ok(())
        }
        Err(e) => {
            error!(target: "runtime", error = ?e, "fatal");
            eprintln!("launchpad: {e:#}");
            std::process::exit(1);
        }
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("launchpad.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "launchpad.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global subscriber already installed; drop the guard so the
        // writer shuts down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).expect("argv should parse")
    }

    #[test]
    fn cli_aliases_and_spec() {
        let args = parse(&["launchpad", "--bin", "prog.bin", "-c", "0:3", "--simulate"]);
        assert_eq!(args.executable.as_deref(), Some(Path::new("prog.bin")));
        assert_eq!(args.cores.as_deref(), Some("0:3"));
        assert!(args.simulate);
        assert!(!args.reset && !args.config);
    }

    #[test]
    fn cli_wins_over_file_defaults() {
        let mut image = tempfile::NamedTempFile::new().unwrap();
        image.write_all(b"code").unwrap();
        let path = image.path().display().to_string();

        let defaults = FileDefaults::default();
        let args = parse(&["launchpad", "--exe", &path, "-c", "2"]);
        let config = build_config(&args, &defaults).unwrap();
        assert_eq!(config.executable_path.as_deref(), Some(image.path()));
        assert_eq!(config.enabled.iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn file_defaults_apply_when_cli_is_silent() {
        let mut image = tempfile::NamedTempFile::new().unwrap();
        image.write_all(b"code").unwrap();

        let mut defaults = FileDefaults::default();
        defaults.session.executable = Some(image.path().to_path_buf());
        defaults.session.cores = Some("all".to_string());

        let args = parse(&["launchpad", "--simulate"]);
        let config = build_config(&args, &defaults).unwrap();
        assert_eq!(config.executable_path.as_deref(), Some(image.path()));
        assert!(config.all_cores);
    }

    #[test]
    fn missing_executable_fails_at_startup() {
        let args = parse(&["launchpad", "--exe", "__no_such_image__.bin"]);
        let err = build_config(&args, &FileDefaults::default()).unwrap_err();
        assert!(err.to_string().contains("check it exists"));
    }

    #[test]
    fn bad_core_spec_fails_at_startup() {
        let args = parse(&["launchpad", "-c", "banana"]);
        let err = build_config(&args, &FileDefaults::default()).unwrap_err();
        assert!(err.to_string().contains("invalid core specification"));
    }

    #[test]
    fn device_refused_without_backend() {
        let args = parse(&["launchpad"]);
        assert!(open_device(&args).is_err());
        let args = parse(&["launchpad", "--simulate"]);
        assert!(open_device(&args).is_ok());
    }
}
