//! Telemetry reader over the sysfs virtual filesystem
//!
//! Every entry this crate touches is a plain-text scalar file. Reads never
//! fail loudly: an unreadable or malformed entry is reported as `None`, and
//! callers must treat that as "unavailable", never as zero.
//!
//! # Units
//!
//! Raw sysfs values are millidegrees Celsius and kHz. They are converted to
//! °C and Hz here and nowhere else.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::constants::{paths, units};

/// Handle on a sysfs tree
///
/// Defaults to the real filesystem root. Tests point it at a temporary
/// directory laid out like `/sys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sysfs {
    root: PathBuf,
}

impl Sysfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `sys/class/thermal/thermal_zone<index>`
    pub fn thermal_zone_dir(&self, index: usize) -> PathBuf {
        self.root
            .join(paths::THERMAL_BASE)
            .join(format!("{}{}", paths::THERMAL_ZONE_PREFIX, index))
    }

    /// `sys/class/hwmon/hwmon<index>`
    pub fn hwmon_dir(&self, index: usize) -> PathBuf {
        self.root
            .join(paths::HWMON_BASE)
            .join(format!("{}{}", paths::HWMON_PREFIX, index))
    }

    /// `sys/devices/system/cpu/cpu<index>/cpufreq/<file>`
    pub fn cpufreq_file(&self, cpu: usize, file: &str) -> PathBuf {
        self.root
            .join(paths::CPU_BASE)
            .join(format!("{}{}", paths::CPU_PREFIX, cpu))
            .join(paths::CPUFREQ_DIR)
            .join(file)
    }
}

impl Default for Sysfs {
    fn default() -> Self {
        Self::new("/")
    }
}

/// Read the first whitespace-delimited integer token from `path`
///
/// Returns `None` if the file cannot be opened or the first token is not an
/// integer.
pub fn read_scalar(path: &Path) -> Option<i64> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            trace!(path = %path.display(), error = %e, "scalar read failed");
            return None;
        }
    };

    let value = content.split_whitespace().next()?.parse::<i64>().ok();
    if value.is_none() {
        trace!(path = %path.display(), "no integer token");
    }
    value
}

/// Read one line from `path` with a single trailing line terminator removed
///
/// An empty line is reported as `None`, identical to a missing file.
pub fn read_line(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let line = content.split_inclusive('\n').next().unwrap_or("");
    let line = line
        .strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line);

    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Read a millidegree file as °C
pub fn read_celsius(path: &Path) -> Option<f64> {
    read_scalar(path).map(millidegrees_to_celsius)
}

/// Read a kHz file as Hz
pub fn read_hz(path: &Path) -> Option<f64> {
    read_scalar(path).map(khz_to_hz)
}

pub fn millidegrees_to_celsius(raw: i64) -> f64 {
    raw as f64 / units::MILLIDEGREE_DIVISOR
}

pub fn khz_to_hz(raw: i64) -> f64 {
    raw as f64 * units::KHZ_TO_HZ
}

/// Convert Hz to the integer kHz value a cpufreq file expects (truncating)
pub fn hz_to_khz(hz: f64) -> i64 {
    (hz / units::KHZ_TO_HZ) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_scalar_plain() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "temp", "45000\n");
        assert_eq!(read_scalar(&path), Some(45000));
    }

    #[test]
    fn test_read_scalar_first_token_only() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "freq", "  -12 800000\n");
        assert_eq!(read_scalar(&path), Some(-12));
    }

    #[test]
    fn test_read_scalar_absent() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_scalar(&dir.path().join("missing")), None);

        let path = write(&dir, "garbage", "enabled\n");
        assert_eq!(read_scalar(&path), None);

        let path = write(&dir, "empty", "");
        assert_eq!(read_scalar(&path), None);
    }

    #[test]
    fn test_read_line_strips_one_terminator() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "name", "coretemp\n");
        assert_eq!(read_line(&path).as_deref(), Some("coretemp"));

        let path = write(&dir, "multi", "x86_pkg_temp\nsecond\n");
        assert_eq!(read_line(&path).as_deref(), Some("x86_pkg_temp"));

        let path = write(&dir, "noeol", "acpitz");
        assert_eq!(read_line(&path).as_deref(), Some("acpitz"));
    }

    #[test]
    fn test_read_line_empty_is_absent() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty", "\n");
        assert_eq!(read_line(&path), None);
        assert_eq!(read_line(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(millidegrees_to_celsius(45000), 45.0);
        assert_eq!(millidegrees_to_celsius(-500), -0.5);
        assert_eq!(khz_to_hz(800_000), 800_000_000.0);
        assert_eq!(hz_to_khz(3_200_000_000.0), 3_200_000);
        assert_eq!(hz_to_khz(1_234_567_890.0), 1_234_567);
    }

    #[test]
    fn test_layout() {
        let sysfs = Sysfs::new("/tmp/fake");
        assert_eq!(
            sysfs.thermal_zone_dir(3),
            PathBuf::from("/tmp/fake/sys/class/thermal/thermal_zone3")
        );
        assert_eq!(
            sysfs.hwmon_dir(0),
            PathBuf::from("/tmp/fake/sys/class/hwmon/hwmon0")
        );
        assert_eq!(
            sysfs.cpufreq_file(7, "scaling_max_freq"),
            PathBuf::from("/tmp/fake/sys/devices/system/cpu/cpu7/cpufreq/scaling_max_freq")
        );
        assert_eq!(Sysfs::default().root(), Path::new("/"));
    }
}
