//! Hardware interaction modules
//!
//! Everything that touches sysfs lives here: temperature sensors, the
//! cpufreq ceiling and the startup capability check.

mod capability;
mod cpufreq;
mod scan;
mod sensors;
mod sysfs;

pub use capability::{check_actuation, CapabilityBudget};
pub use cpufreq::{ceiling_matches, set_ceiling_verified, Actuator, Cpufreq};
pub use scan::scan_contiguous;
pub use sensors::{list_sensors, resolve, SensorHandle};
pub use sysfs::{
    hz_to_khz, khz_to_hz, millidegrees_to_celsius, read_celsius, read_hz, read_line,
    read_scalar, Sysfs,
};

#[cfg(test)]
pub use cpufreq::MockActuator;
