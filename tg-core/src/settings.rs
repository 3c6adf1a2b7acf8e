//! Governor settings
//!
//! Settings come from an optional JSON file and are then overridden field by
//! field from the command line. Missing fields take the defaults in
//! [`crate::constants::control`].
//!
//! ```json
//! {
//!   "sensor": "x86_pkg_temp",
//!   "target_celsius": 75.0,
//!   "period_secs": 0.5,
//!   "proportional_gain": 20000000.0,
//!   "derivative_gain": 20000000.0
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::constants::control;
use crate::data::{validate_gain, validate_period};
use crate::engine::PdGains;
use crate::error::{Result, ThermgovError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GovernorSettings {
    /// Thermal zone type or hwmon name to regulate on
    pub sensor: Option<String>,
    /// Target temperature in °C; `None` means report the temperature and exit
    pub target_celsius: Option<f64>,
    /// Control period in seconds
    pub period_secs: f64,
    /// Proportional gain in Hz/°C per second of period
    pub proportional_gain: f64,
    /// Derivative gain in Hz/°C per second of period
    pub derivative_gain: f64,
    /// Print one status line per period
    pub verbose: bool,
    /// Lock file; `Some` selects daemon mode
    pub pid_file: Option<PathBuf>,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            sensor: None,
            target_celsius: None,
            period_secs: control::DEFAULT_PERIOD_SECS,
            proportional_gain: control::DEFAULT_PROPORTIONAL_GAIN,
            derivative_gain: control::DEFAULT_DERIVATIVE_GAIN,
            verbose: false,
            pid_file: None,
        }
    }
}

impl GovernorSettings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ThermgovError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load settings from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn period(&self) -> Result<Duration> {
        validate_period(self.period_secs)
    }

    /// Gains scaled to the configured period
    pub fn gains(&self) -> Result<PdGains> {
        let kp = validate_gain("proportional_gain", self.proportional_gain)?;
        let kd = validate_gain("derivative_gain", self.derivative_gain)?;
        Ok(PdGains::for_period(kp, kd, self.period()?))
    }

    pub fn is_daemon(&self) -> bool {
        self.pid_file.is_some()
    }
}
