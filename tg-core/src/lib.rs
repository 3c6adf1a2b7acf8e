//! Thermgov Core Library
//!
//! Closed-loop CPU thermal governor for Linux: keeps a chosen temperature
//! sensor near a target by moving the cpufreq frequency ceiling of every core.
//!
//! # Module Structure
//!
//! - `hw/` - Sysfs access (sensors, cpufreq actuator, capability check)
//! - `data/` - Data types and validation
//! - `engine/` - PD law and governor state machine
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tg_core::{check_actuation, resolve, Actuator, CapabilityBudget, Cpufreq};
//! use tg_core::{Governor, PdController, PdGains, Sysfs};
//!
//! let sysfs = Sysfs::default();
//! let sensor = resolve(&sysfs, "x86_pkg_temp").unwrap();
//! let cpufreq = Cpufreq::new(sysfs);
//! let bounds = cpufreq.bounds().unwrap();
//! check_actuation(&cpufreq, &bounds, CapabilityBudget::default()).unwrap();
//!
//! let period = Duration::from_secs(1);
//! let controller = PdController::new(PdGains::reference(period), 75.0, bounds);
//! let mut governor = Governor::new(sensor, cpufreq, controller);
//! loop {
//!     governor.tick();
//!     std::thread::sleep(period);
//! }
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod error;
pub mod settings;

#[cfg(any(test, feature = "testing"))]
pub mod test_support;

// Re-export primary types from data/
pub use data::{FrequencyBounds, SensorNamespace, SensorReading};

// Re-export validation functions from data/
pub use data::{
    validate_gain, validate_period, validate_sensor_id, validate_settings, validate_target,
};

// Re-export error types
pub use error::{Result, ThermgovError};

// Re-export engine types
pub use engine::{
    ControlPhase, ControlState, Governor, PdController, PdGains, TemperatureSource, Tick,
    TickOutcome,
};

// Re-export hardware functions from hw/
pub use hw::{
    ceiling_matches, check_actuation, list_sensors, resolve, set_ceiling_verified,
    Actuator, CapabilityBudget, Cpufreq, SensorHandle, Sysfs,
};

// Re-export settings
pub use settings::GovernorSettings;
