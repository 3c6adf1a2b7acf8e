//! Settings validation
//!
//! Everything here runs before any hardware is touched; a failure is a fatal
//! startup condition.

use std::time::Duration;

use crate::error::{Result, ThermgovError};
use crate::settings::GovernorSettings;

/// Validates a control period in seconds and converts it to a `Duration`
pub fn validate_period(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ThermgovError::invalid_config(
            "period",
            format!("a positive real value is expected, got {}", secs),
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ThermgovError::invalid_config("period", e.to_string()))
}

/// Validates a target temperature in °C
pub fn validate_target(celsius: f64) -> Result<f64> {
    if !celsius.is_finite() {
        return Err(ThermgovError::invalid_config(
            "temp",
            format!("a real value is expected, got {}", celsius),
        ));
    }
    Ok(celsius)
}

/// Validates a per-second controller gain
pub fn validate_gain(field: &str, gain: f64) -> Result<f64> {
    if !gain.is_finite() || gain < 0.0 {
        return Err(ThermgovError::invalid_config(
            field,
            format!("a non-negative finite value is expected, got {}", gain),
        ));
    }
    Ok(gain)
}

/// Validates a sensor id: non-empty, single line
pub fn validate_sensor_id(id: &str) -> Result<&str> {
    if id.is_empty() {
        return Err(ThermgovError::invalid_config("sensor", "sensor id is empty"));
    }
    if id.contains(['\n', '\0']) {
        return Err(ThermgovError::invalid_config(
            "sensor",
            "sensor id contains a line break or NUL",
        ));
    }
    Ok(id)
}

/// Validates settings for a control or query run
pub fn validate_settings(settings: &GovernorSettings) -> Result<()> {
    match settings.sensor.as_deref() {
        Some(id) => {
            validate_sensor_id(id)?;
        }
        None => return Err(ThermgovError::invalid_config("sensor", "no sensor specified")),
    }

    validate_period(settings.period_secs)?;
    if let Some(target) = settings.target_celsius {
        validate_target(target)?;
    }
    validate_gain("proportional_gain", settings.proportional_gain)?;
    validate_gain("derivative_gain", settings.derivative_gain)?;

    if let Some(pid_file) = &settings.pid_file {
        if pid_file.as_os_str().is_empty() {
            return Err(ThermgovError::invalid_config("daemon", "pid file name is empty"));
        }
        if settings.verbose {
            return Err(ThermgovError::config(
                "--daemon and --verbose cannot be specified at a time",
            ));
        }
        if settings.target_celsius.is_none() {
            return Err(ThermgovError::invalid_config(
                "temp",
                "a target temperature is required in daemon mode",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings() -> GovernorSettings {
        GovernorSettings {
            sensor: Some("CPU".to_string()),
            target_celsius: Some(60.0),
            ..GovernorSettings::default()
        }
    }

    #[test]
    fn test_period() {
        assert_eq!(validate_period(1.0).unwrap(), Duration::from_secs(1));
        assert_eq!(validate_period(0.25).unwrap(), Duration::from_millis(250));
        assert!(validate_period(0.0).is_err());
        assert!(validate_period(-1.0).is_err());
        assert!(validate_period(f64::NAN).is_err());
        assert!(validate_period(f64::INFINITY).is_err());
        assert!(validate_period(1e300).is_err());
    }

    #[test]
    fn test_target_and_gain() {
        assert_eq!(validate_target(-10.5).unwrap(), -10.5);
        assert!(validate_target(f64::NAN).is_err());
        assert!(validate_gain("kp", 0.0).is_ok());
        assert!(validate_gain("kp", -1.0).is_err());
        assert!(validate_gain("kp", f64::INFINITY).is_err());
    }

    #[test]
    fn test_sensor_id() {
        assert!(validate_sensor_id("x86_pkg_temp").is_ok());
        assert!(validate_sensor_id("").is_err());
        assert!(validate_sensor_id("a\nb").is_err());
    }

    #[test]
    fn test_settings_ok() {
        assert!(validate_settings(&settings()).is_ok());

        let query = GovernorSettings {
            target_celsius: None,
            ..settings()
        };
        assert!(validate_settings(&query).is_ok());
    }

    #[test]
    fn test_settings_require_sensor() {
        let s = GovernorSettings {
            sensor: None,
            ..settings()
        };
        assert!(validate_settings(&s).unwrap_err().is_config());
    }

    #[test]
    fn test_daemon_and_verbose_conflict() {
        let s = GovernorSettings {
            pid_file: Some(PathBuf::from("/run/thermgov.pid")),
            verbose: true,
            ..settings()
        };
        assert!(validate_settings(&s).is_err());

        let s = GovernorSettings {
            pid_file: Some(PathBuf::from("/run/thermgov.pid")),
            ..settings()
        };
        assert!(validate_settings(&s).is_ok());
    }

    #[test]
    fn test_daemon_requires_target() {
        let s = GovernorSettings {
            pid_file: Some(PathBuf::from("/run/thermgov.pid")),
            target_celsius: None,
            ..settings()
        };
        assert!(validate_settings(&s).is_err());
    }
}
