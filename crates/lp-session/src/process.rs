//! Command processor.
//!
//! Executes a parsed [`Command`] against the shared session state. Driver
//! sequences run under the device lock; every paint happens outside it.
//! User mistakes (mutating while running, bad arguments, missing files)
//! come back as [`CommandOutcome::Error`] with a red bottom-line message
//! and leave state untouched; driver failures propagate as hard errors and
//! end the session.

use crate::command::{Command, CommandOutcome};
use crate::lifecycle::{self, LifecycleError};
use crate::paint::SessionPaint;
use crate::state::SessionShared;
use anyhow::{Context, Result};
use lp_config::{CoreSpec, SpecError, parse_core_spec};
use tracing::info;

const HELP_TEXT: &str = "\
Launchpad Interactive Help
--------------------------
Escape key to enter command mode, the following commands apply:
:status      - Display current soft core status including active and enabled cores
:config      - Display soft core CPU and board configuration and status
:clear       - Clears the output screen
:stop        - Stop all cores
:start       - Start all enabled cores
:exe, :bin   - Specify the binary executable that cores should run
:e, :enable  - Enables core(s) provided as a singleton, list or range (does not start)
:c, :cores   - Sets core(s) provided as a singleton, list or range as the active set (does not start)
:d, :disable - Disables core(s) provided as a singleton, list or range (does not stop)
:reset       - Reset device and stop all cores
:h, :help    - Display this help message
:q, :quit    - Quit Launchpad

Enter (empty command) quits command mode without a command
";

pub fn execute<P: SessionPaint>(
    command: Command,
    shared: &SessionShared,
    paint: &mut P,
) -> Result<CommandOutcome> {
    match command {
        Command::Quit => Ok(CommandOutcome::Quit),
        Command::Help => {
            paint.panel(HELP_TEXT);
            Ok(CommandOutcome::Success)
        }
        Command::Clear => {
            paint.clear_screen();
            Ok(CommandOutcome::NewScreen)
        }
        Command::Status => {
            paint.panel(&status_text(shared));
            Ok(CommandOutcome::Success)
        }
        Command::Config => handle_config(shared, paint),
        Command::Reset => handle_reset(shared, paint),
        Command::Stop => handle_stop(shared, paint),
        Command::Start => handle_start(shared, paint),
        Command::Enable(arg) => handle_core_change(shared, paint, &arg, CoreChange::Enable),
        Command::ReplaceCores(arg) => handle_core_change(shared, paint, &arg, CoreChange::Replace),
        Command::Disable(arg) => handle_core_change(shared, paint, &arg, CoreChange::Disable),
        Command::SetExecutable(arg) => handle_set_executable(shared, paint, &arg),
        Command::Unknown(_) => Ok(CommandOutcome::NotRecognised),
    }
}

fn status_text(shared: &SessionShared) -> String {
    let config = shared.config.lock().expect("config poisoned");
    let active = shared.status.cores_active();
    let mut out = String::from("Launchpad Current Status\n------------------------\n");
    if shared.status.running() {
        out.push_str("Soft cores currently running\n");
    } else {
        out.push_str("Soft cores currently stopped\n");
    }
    for core in 0..shared.device_config.number_cores {
        out.push_str(&format!(
            "Core {core}: {} ({})\n",
            if active.contains(core) { "active" } else { "inactive" },
            if config.enabled.contains(core) { "enabled" } else { "disabled" },
        ));
    }
    match &config.executable_path {
        Some(path) => out.push_str(&format!("Executable: {}\n", path.display())),
        None => out.push_str("Executable: (none)\n"),
    }
    out
}

fn handle_config<P: SessionPaint>(shared: &SessionShared, paint: &mut P) -> Result<CommandOutcome> {
    let report = {
        let mut device = shared.device.lock().expect("device lock poisoned");
        lp_device::report::device_report(device.as_mut(), &shared.device_config)
            .context("error calling device function")?
    };
    paint.panel(&report);
    Ok(CommandOutcome::Success)
}

fn handle_reset<P: SessionPaint>(shared: &SessionShared, paint: &mut P) -> Result<CommandOutcome> {
    paint.wait_line("Please wait - resetting soft cores");
    {
        let mut device = shared.device.lock().expect("device lock poisoned");
        device.reset().context("error calling device function")?;
        shared.flags.set_poll_enabled(false);
        // Reinitialise straight away, the operator will want to carry on.
        device
            .initialise()
            .context("error calling device function")?;
    }
    shared.status.set_initialised(true);
    shared.status.clear_cores_active();
    info!(target: "session.command", "device_reset");
    paint.notice("Reset successful, cores all idle");
    Ok(CommandOutcome::Success)
}

fn handle_stop<P: SessionPaint>(shared: &SessionShared, paint: &mut P) -> Result<CommandOutcome> {
    if !shared.status.running() {
        paint.error_line("Cores are already stopped");
        return Ok(CommandOutcome::Error);
    }
    {
        let mut device = shared.device.lock().expect("device lock poisoned");
        device
            .stop_all_cores()
            .context("error calling device function")?;
        shared.flags.set_poll_enabled(false);
    }
    shared.status.clear_cores_active();
    shared.status.set_running(false);
    paint.notice("All cores stopped and idle");
    // Output staged before or during the stop is stale; drop it at the
    // next drain opportunity rather than spilling it into a later run.
    shared.flags.set_discard_paused_output(true);
    info!(target: "session.command", "cores_stopped");
    Ok(CommandOutcome::Success)
}

fn handle_start<P: SessionPaint>(shared: &SessionShared, paint: &mut P) -> Result<CommandOutcome> {
    if shared.status.running() {
        paint.error_line("Cores are already running");
        return Ok(CommandOutcome::Error);
    }
    let (enabled, executable) = {
        let config = shared.config.lock().expect("config poisoned");
        (
            config.enabled_on_device(shared.device_config.number_cores),
            config.executable_path.clone(),
        )
    };
    if enabled.is_empty() {
        paint.error_line("No cores are enabled, enable at-least one before starting");
        return Ok(CommandOutcome::Error);
    }
    let Some(executable) = executable else {
        paint.error_line(
            "No executable file has been specified, you must provide this to start the cores",
        );
        return Ok(CommandOutcome::Error);
    };

    shared.flags.set_discard_paused_output(false);
    let started = {
        let mut device = shared.device.lock().expect("device lock poisoned");
        match lifecycle::load_and_distribute(
            device.as_mut(),
            &shared.device_config,
            enabled,
            &executable,
        ) {
            Ok(_) => {}
            Err(LifecycleError::Image { path, .. }) => {
                drop(device);
                paint.error_line(&format!(
                    "Error reading executable file '{}', check it exists",
                    path.display()
                ));
                return Ok(CommandOutcome::Error);
            }
            Err(LifecycleError::Device(e)) => {
                return Err(anyhow::Error::new(e).context("error calling device function"));
            }
        }
        let started =
            lifecycle::start_enabled_cores(device.as_mut(), &shared.device_config, enabled)
                .context("error calling device function")?;
        shared.flags.set_poll_enabled(true);
        started
    };
    shared.status.set_cores_active(enabled);
    shared.status.set_running(true);
    info!(target: "session.command", started, "cores_started");
    paint.notice(&format!("{started} cores started"));
    Ok(CommandOutcome::Success)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CoreChange {
    Enable,
    Replace,
    Disable,
}

fn handle_core_change<P: SessionPaint>(
    shared: &SessionShared,
    paint: &mut P,
    arg: &str,
    change: CoreChange,
) -> Result<CommandOutcome> {
    if shared.status.running() {
        paint.error_line("Can only change active cores in a stopped state, stop running cores first");
        return Ok(CommandOutcome::Error);
    }
    let spec = match parse_core_spec(arg) {
        Ok(spec) => spec,
        Err(SpecError::Empty) => {
            paint.error_line("Must provide arguments with enable or core command");
            return Ok(CommandOutcome::Error);
        }
        Err(e) => {
            paint.error_line(&e.to_string());
            return Ok(CommandOutcome::Error);
        }
    };

    let number_cores = shared.device_config.number_cores;
    let applied_all = matches!(spec, CoreSpec::All);
    let mut config = shared.config.lock().expect("config poisoned");
    let before = config.enabled;
    match change {
        CoreChange::Enable => config.enable_cores(spec),
        CoreChange::Replace => config.set_cores(spec),
        CoreChange::Disable => config.disable_cores(spec),
    }
    // Resolve an explicit `all` immediately, the device core count is
    // known. Expanding on every change would resurrect cores disabled
    // after an earlier `all`.
    if applied_all {
        config.expand_all_cores(number_cores);
    }
    let unaddressable = config.warn_unaddressable(number_cores);
    let enabled_now = config.enabled_on_device(number_cores).count();
    let changed = config.enabled != before;
    drop(config);

    for core in unaddressable {
        paint.notice(&format!(
            "Core {core} enabled but the device only has {number_cores} cores, will be ignored"
        ));
    }
    match change {
        CoreChange::Disable if changed => paint.notice(&format!(
            "Core(s) disabled, there are now {enabled_now} cores enabled"
        )),
        CoreChange::Disable => paint.notice(&format!(
            "No cores in disable list were enabled, there are still {enabled_now} cores enabled"
        )),
        _ => paint.notice(&format!("There are now {enabled_now} cores enabled")),
    }
    Ok(CommandOutcome::Success)
}

fn handle_set_executable<P: SessionPaint>(
    shared: &SessionShared,
    paint: &mut P,
    arg: &str,
) -> Result<CommandOutcome> {
    if shared.status.running() {
        paint.error_line("Can only change executable in a stopped state, stop running cores first");
        return Ok(CommandOutcome::Error);
    }
    let arg = arg.trim();
    if arg.is_empty() {
        paint.error_line("Must provide arguments with enable or core command");
        return Ok(CommandOutcome::Error);
    }
    let path = std::path::PathBuf::from(arg);
    if !path.exists() {
        paint.error_line("Specified file does not exist");
        return Ok(CommandOutcome::Error);
    }
    let mut config = shared.config.lock().expect("config poisoned");
    config.executable_path = Some(path.clone());
    drop(config);
    info!(target: "session.command", executable = %path.display(), "executable_changed");
    paint.notice(&format!(
        "Successfully changed executable to '{}'",
        path.display()
    ));
    Ok(CommandOutcome::Success)
}
