//! Run modes
//!
//! Startup order for a governed run:
//!
//! 1. validate settings (no hardware touched yet)
//! 2. resolve the sensor and read the frequency bounds
//! 3. daemon mode: take the lock, superseding a running instance
//! 4. capability check (min, then max)
//! 5. daemon mode: detach, then record our PID
//! 6. control loop until a termination signal
//!
//! From step 4 on a [`RecoveryGuard`] holds the recovery obligation: the
//! startup ceiling is written back if the check fails, the maximum on every
//! later exit path. Termination signals stay pending from step 4 until the
//! loop's signal streams are registered in step 6.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tg_core::{
    check_actuation, list_sensors, resolve, validate_settings, Actuator, CapabilityBudget,
    Cpufreq, Governor, GovernorSettings, PdController, SensorHandle, SensorReading, Sysfs,
};
use tracing::{debug, info};

use crate::cli::Cli;
use crate::control_loop::{self, LoopSummary, Signals};
use crate::daemon::{self, DeferredSignals, LockBudget, PidLock, RecoveryGuard};

/// Settings from the config file (explicit or default location) with
/// command-line overrides applied
pub fn load_settings(cli: &Cli) -> anyhow::Result<GovernorSettings> {
    let from_file = match &cli.config {
        Some(path) => GovernorSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => {
            let default = Path::new(tg_core::constants::paths::DEFAULT_CONFIG_FILE);
            GovernorSettings::load_or_default(default)
                .with_context(|| format!("Failed to load settings from {}", default.display()))?
        }
    };
    Ok(cli.apply_to(from_file))
}

/// `id (45.5 C), id (38 C), ...`
pub fn format_sensor_listing(readings: &[SensorReading]) -> String {
    readings
        .iter()
        .map(|r| format!("{} ({} C)", r.id, r.celsius))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print every readable sensor to stdout
pub fn print_sensors(sysfs: &Sysfs, json: bool) -> anyhow::Result<()> {
    let readings = list_sensors(sysfs);
    if json {
        println!("{}", serde_json::to_string_pretty(&readings)?);
    } else {
        for r in &readings {
            println!("{:<20} {:>8.1} C  {}", r.id, r.celsius, r.path.display());
        }
    }
    Ok(())
}

/// Current temperature of the configured sensor in °C
pub fn query_temperature(sysfs: &Sysfs, sensor_id: &str) -> anyhow::Result<f64> {
    let sensor = resolve(sysfs, sensor_id)?;
    sensor
        .read_celsius()
        .with_context(|| format!("Sensor {} became unreadable", sensor.path().display()))
}

/// Stop the instance holding `pid_file` and exit
pub fn kill_daemon(pid_file: &Path) -> anyhow::Result<()> {
    let lock = PidLock::acquire_or_supersede(pid_file, LockBudget::default(), daemon::request_termination)?;
    info!(path = %pid_file.display(), "Running instance stopped");
    lock.release();
    Ok(())
}

/// An absolute pid file path, since detaching moves the working directory
fn absolute_pid_path(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to resolve pid file path")?;
    Ok(cwd.join(path))
}

/// A governor that passed its capability check, ready to run
///
/// Field order is drop order: the ceiling is restored before deferred
/// signals are let through.
pub struct Session {
    governor: Governor<SensorHandle, Cpufreq>,
    guard: RecoveryGuard<Cpufreq>,
    deferred: Option<DeferredSignals>,
    period: Duration,
    verbose: bool,
    daemon: bool,
}

impl Session {
    pub fn governor(&self) -> &Governor<SensorHandle, Cpufreq> {
        &self.governor
    }

    pub fn governor_mut(&mut self) -> &mut Governor<SensorHandle, Cpufreq> {
        &mut self.governor
    }

    /// Detach if asked to, then run the control loop until a stop signal
    ///
    /// The maximum ceiling is restored when the session drops, whichever way
    /// this returns.
    pub fn run(mut self) -> anyhow::Result<LoopSummary> {
        if self.daemon {
            daemon::detach()?;
            if let Some(lock) = self.guard.lock_mut() {
                lock.write_pid()?;
            }
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build runtime")?;

        let governor = &mut self.governor;
        let deferred = &mut self.deferred;
        let (period, verbose) = (self.period, self.verbose);

        let summary = runtime.block_on(async move {
            let mut signals = Signals::register().context("Failed to register signal handlers")?;
            *deferred = None;
            let summary = control_loop::run_until(governor, period, verbose, signals.recv()).await;
            Ok::<_, anyhow::Error>(summary)
        })?;

        info!(
            signal = %summary.stop,
            iterations = summary.iterations,
            applied = summary.applied,
            "Governor stopped"
        );
        Ok(summary)
    }
}

/// Steps 1 to 4 of a governed run
pub fn start_governor(settings: &GovernorSettings, sysfs: &Sysfs) -> anyhow::Result<Session> {
    start_governor_with(settings, sysfs, CapabilityBudget::default(), LockBudget::default())
}

/// [`start_governor`] with explicit retry budgets
pub fn start_governor_with(
    settings: &GovernorSettings,
    sysfs: &Sysfs,
    capability: CapabilityBudget,
    lock_budget: LockBudget,
) -> anyhow::Result<Session> {
    validate_settings(settings)?;
    let (Some(sensor_id), Some(target)) = (settings.sensor.as_deref(), settings.target_celsius) else {
        anyhow::bail!("a sensor and a target temperature are required to run the governor");
    };
    let period = settings.period()?;
    let gains = settings.gains()?;

    let sensor = resolve(sysfs, sensor_id)?;
    let cpufreq = Cpufreq::new(sysfs.clone());
    let bounds = cpufreq.bounds()?;

    if settings.verbose {
        println!("Sensor file name : {}", sensor.path().display());
        println!("Max freq : {} MHz", bounds.max() / 1_000_000.0);
        println!("Min freq : {} MHz", bounds.min() / 1_000_000.0);
        match cpufreq.operating_frequency() {
            Some(hz) => println!("Cur freq : {} MHz", hz / 1_000_000.0),
            None => println!("Cur freq : ? MHz"),
        }
    }

    let lock = match &settings.pid_file {
        Some(path) => {
            let path = absolute_pid_path(path)?;
            Some(PidLock::acquire_or_supersede(&path, lock_budget, daemon::request_termination)?)
        }
        None => None,
    };

    let deferred = DeferredSignals::block()?;
    let startup_ceiling = cpufreq.current_ceiling().unwrap_or(bounds.max());
    let mut guard = RecoveryGuard::new(cpufreq.clone(), startup_ceiling, lock);

    check_actuation(&cpufreq, &bounds, capability)?;
    guard.restore_to(bounds.max());
    debug!(%bounds, "Capability check passed");

    let controller = PdController::new(gains, target, bounds);
    let governor = Governor::new(sensor, cpufreq, controller);

    info!(
        sensor = sensor_id,
        target,
        period_secs = period.as_secs_f64(),
        "Governor ready"
    );

    Ok(Session {
        governor,
        guard,
        deferred: Some(deferred),
        period,
        verbose: settings.verbose,
        daemon: settings.is_daemon(),
    })
}

/// Query or govern, depending on whether a target is set
pub fn run(settings: &GovernorSettings, sysfs: &Sysfs) -> anyhow::Result<()> {
    validate_settings(settings)?;

    match (settings.sensor.as_deref(), settings.target_celsius) {
        (Some(sensor_id), None) => {
            println!("{}", query_temperature(sysfs, sensor_id)?);
            Ok(())
        }
        _ => {
            start_governor(settings, sysfs)?.run()?;
            Ok(())
        }
    }
}
