//! Constants and configuration values for thermgov
//!
//! Centralizes sysfs layout, unit factors, scan limits and retry budgets.
//! Other modules should not carry their own magic numbers.

use std::time::Duration;

/// Sysfs layout, relative to the sysfs root (normally `/`)
pub mod paths {
    /// Thermal zone namespace: `thermal_zoneN/{type,temp}`
    pub const THERMAL_BASE: &str = "sys/class/thermal";
    pub const THERMAL_ZONE_PREFIX: &str = "thermal_zone";
    pub const THERMAL_ZONE_NAME: &str = "type";
    pub const THERMAL_ZONE_VALUE: &str = "temp";

    /// Hardware monitor namespace: `hwmonN/{name,temp1_input}`
    pub const HWMON_BASE: &str = "sys/class/hwmon";
    pub const HWMON_PREFIX: &str = "hwmon";
    pub const HWMON_NAME: &str = "name";
    pub const HWMON_VALUE: &str = "temp1_input";

    /// Per-core cpufreq namespace: `cpuN/cpufreq/<file>`
    pub const CPU_BASE: &str = "sys/devices/system/cpu";
    pub const CPU_PREFIX: &str = "cpu";
    pub const CPUFREQ_DIR: &str = "cpufreq";
    pub const CPUINFO_MIN_FREQ: &str = "cpuinfo_min_freq";
    pub const CPUINFO_MAX_FREQ: &str = "cpuinfo_max_freq";
    pub const SCALING_MAX_FREQ: &str = "scaling_max_freq";
    pub const SCALING_CUR_FREQ: &str = "scaling_cur_freq";

    /// Default settings file, read when present and no --config is given
    pub const DEFAULT_CONFIG_FILE: &str = "/etc/thermgov/config.json";
}

/// Unit conversion at the sysfs boundary
pub mod units {
    /// Sysfs temperatures are millidegrees Celsius
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;

    /// cpufreq files are kHz; everything above the actuator is Hz
    pub const KHZ_TO_HZ: f64 = 1000.0;
}

/// Upper bounds on the contiguous index scans
pub mod scan {
    /// Thermal zones are a small bounded set
    pub const MAX_THERMAL_ZONES: usize = 16;

    /// Hardware monitor groups are a small bounded set
    pub const MAX_HWMON_NODES: usize = 16;

    /// Generous ceiling for logical CPUs; the scan stops at the first gap
    pub const MAX_CPUS: usize = 8192;
}

/// Startup capability check budget
pub mod capability {
    use super::Duration;

    /// Read-back polls per stage (min, then max)
    pub const POLL_ATTEMPTS: u32 = 10;

    /// Delay between read-back polls
    pub const POLL_DELAY: Duration = Duration::from_millis(100);
}

/// Feedback controller defaults
pub mod control {
    use super::Duration;

    /// Reference proportional gain in Hz per °C per second of control period
    pub const DEFAULT_PROPORTIONAL_GAIN: f64 = 20_000_000.0;

    /// Reference derivative gain in Hz per °C per second of control period
    pub const DEFAULT_DERIVATIVE_GAIN: f64 = 20_000_000.0;

    /// Default control period in seconds
    pub const DEFAULT_PERIOD_SECS: f64 = 1.0;

    /// Read-back attempts after each steady-state ceiling write
    pub const VERIFY_ATTEMPTS: u32 = 3;

    /// Delay between steady-state read-back attempts
    pub const VERIFY_DELAY: Duration = Duration::from_millis(10);

    /// Consecutive failures before the loop escalates from debug to warn
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;
}

/// Lock identity / supersession budget
pub mod lock {
    use super::Duration;

    /// Acquisition attempts before contention is declared fatal
    pub const ACQUIRE_ATTEMPTS: u32 = 10;

    /// Backoff between acquisition attempts
    pub const ACQUIRE_BACKOFF: Duration = Duration::from_millis(100);

    /// Reopens when the file is replaced between `open` and `flock`
    pub const REOPEN_ATTEMPTS: u32 = 5;

    /// Lock file permissions
    pub const FILE_MODE: u32 = 0o600;
}
