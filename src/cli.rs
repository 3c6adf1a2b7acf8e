//! Command Line Interface

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use tg_core::GovernorSettings;

#[derive(Parser, Debug)]
#[command(name = "thermgov")]
#[command(version)]
#[command(about = "Controls the CPU frequency to keep its temperature close to a target")]
#[command(long_about = "thermgov - closed-loop CPU thermal governor

Reads one temperature sensor every period and moves the scaling_max_freq
ceiling of every core so the temperature converges on the target. With a
sensor but no target, prints the current temperature and exits.

EXAMPLES:
    thermgov --list-sensors                      List sensors with live readings
    thermgov --sensor x86_pkg_temp               Print the current temperature
    thermgov --sensor x86_pkg_temp --temp 75 --verbose
    thermgov --sensor coretemp --temp 70 --period 0.5 --daemon /run/thermgov.pid
    thermgov --kill-daemon /run/thermgov.pid     Stop a running daemon

ENVIRONMENT VARIABLES:
    THERMGOV_LOG=debug     Log filter (trace, debug, info, warn, error)

FILES:
    /etc/thermgov/config.json   Default settings, overridden by options")]
pub struct Cli {
    /// Sensor id: a thermal zone type or an hwmon name
    #[arg(short, long, value_name = "ID")]
    pub sensor: Option<String>,

    /// Target CPU temperature in °C
    #[arg(short, long = "temp", value_name = "CELSIUS", allow_negative_numbers = true)]
    pub target: Option<f64>,

    /// Control period in seconds
    #[arg(short, long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub period: Option<f64>,

    /// Print frequencies and temperature every period
    #[arg(short, long, conflicts_with = "daemon")]
    pub verbose: bool,

    /// Run in the background, holding PIDFILE as the instance lock
    #[arg(short, long, value_name = "PIDFILE")]
    pub daemon: Option<PathBuf>,

    /// Stop the instance holding PIDFILE and exit
    #[arg(
        short,
        long,
        value_name = "PIDFILE",
        conflicts_with_all = ["daemon", "sensor", "target", "verbose", "list_sensors"]
    )]
    pub kill_daemon: Option<PathBuf>,

    /// Settings file (JSON)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// List available sensors with their current readings
    #[arg(short, long)]
    pub list_sensors: bool,

    /// Print the sensor listing as JSON
    #[arg(long, requires = "list_sensors")]
    pub json: bool,

    /// Root of the sysfs tree
    #[arg(long, value_name = "DIR", default_value = "/", hide = true)]
    pub sysfs_root: PathBuf,
}

impl Cli {
    /// No operation was asked for
    pub fn is_bare(&self) -> bool {
        self.sensor.is_none()
            && self.target.is_none()
            && self.period.is_none()
            && !self.verbose
            && self.daemon.is_none()
            && self.kill_daemon.is_none()
            && self.config.is_none()
            && !self.list_sensors
    }

    /// Overlay options given on the command line onto file settings
    pub fn apply_to(&self, mut settings: GovernorSettings) -> GovernorSettings {
        if let Some(sensor) = &self.sensor {
            settings.sensor = Some(sensor.clone());
        }
        if let Some(target) = self.target {
            settings.target_celsius = Some(target);
        }
        if let Some(period) = self.period {
            settings.period_secs = period;
        }
        if self.verbose {
            settings.verbose = true;
        }
        if let Some(pid_file) = &self.daemon {
            settings.pid_file = Some(pid_file.clone());
        }
        settings
    }
}

/// Rendered long help, for the bare invocation
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}
