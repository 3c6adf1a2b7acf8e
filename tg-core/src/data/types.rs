//! Core data types for thermgov

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// System-wide frequency envelope in Hz
///
/// `min` is the minimum of the per-core `cpuinfo_min_freq` values and `max`
/// the maximum of the per-core `cpuinfo_max_freq` values. Construction
/// guarantees both are finite and `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyBounds {
    min_hz: f64,
    max_hz: f64,
}

impl FrequencyBounds {
    pub fn new(min_hz: f64, max_hz: f64) -> Option<Self> {
        if min_hz.is_finite() && max_hz.is_finite() && min_hz <= max_hz {
            Some(Self { min_hz, max_hz })
        } else {
            None
        }
    }

    pub fn min(&self) -> f64 {
        self.min_hz
    }

    pub fn max(&self) -> f64 {
        self.max_hz
    }

    /// Clamp a frequency command into `[min, max]`
    ///
    /// A NaN command collapses to the floor.
    pub fn clamp(&self, hz: f64) -> f64 {
        if hz.is_nan() {
            self.min_hz
        } else if hz > self.max_hz {
            self.max_hz
        } else if hz < self.min_hz {
            self.min_hz
        } else {
            hz
        }
    }

    pub fn contains(&self, hz: f64) -> bool {
        (self.min_hz..=self.max_hz).contains(&hz)
    }
}

impl fmt::Display for FrequencyBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} MHz", self.min_hz / 1e6, self.max_hz / 1e6)
    }
}

/// Which device namespace a temperature sensor was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SensorNamespace {
    /// `/sys/class/thermal/thermal_zoneN`
    ThermalZone,
    /// `/sys/class/hwmon/hwmonN`
    Hwmon,
}

impl fmt::Display for SensorNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorNamespace::ThermalZone => write!(f, "thermal_zone"),
            SensorNamespace::Hwmon => write!(f, "hwmon"),
        }
    }
}

/// One readable temperature sensor, as listed for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub id: String,
    pub namespace: SensorNamespace,
    pub index: usize,
    pub path: PathBuf,
    pub celsius: f64,
}
