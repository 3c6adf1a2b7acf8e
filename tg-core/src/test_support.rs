//! Fake sysfs trees for tests
//!
//! Builds the subset of `/sys` the governor reads and writes inside a
//! temporary directory. Enabled for this crate's own tests and, through the
//! `testing` feature, for downstream integration tests.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::constants::paths;
use crate::hw::Sysfs;

pub struct FakeSysfs {
    dir: TempDir,
}

impl FakeSysfs {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp sysfs root"),
        }
    }

    pub fn sysfs(&self) -> Sysfs {
        Sysfs::new(self.dir.path())
    }

    fn put(&self, path: PathBuf, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fake sysfs dir");
        }
        fs::write(&path, content).expect("write fake sysfs file");
    }

    /// Add `thermal_zone<index>` with `type` and, if given, raw millidegree `temp`
    pub fn add_thermal_zone(&self, index: usize, zone_type: &str, millidegrees: Option<&str>) {
        let dir = self.sysfs().thermal_zone_dir(index);
        self.put(dir.join(paths::THERMAL_ZONE_NAME), &format!("{}\n", zone_type));
        if let Some(raw) = millidegrees {
            self.put(dir.join(paths::THERMAL_ZONE_VALUE), &format!("{}\n", raw));
        }
    }

    /// Add `hwmon<index>` with `name` and, if given, raw millidegree `temp1_input`
    pub fn add_hwmon(&self, index: usize, name: &str, millidegrees: Option<&str>) {
        let dir = self.sysfs().hwmon_dir(index);
        self.put(dir.join(paths::HWMON_NAME), &format!("{}\n", name));
        if let Some(raw) = millidegrees {
            self.put(dir.join(paths::HWMON_VALUE), &format!("{}\n", raw));
        }
    }

    /// Overwrite the raw contents of `hwmon<index>/temp1_input`
    pub fn set_hwmon_temp(&self, index: usize, raw: &str) {
        let path = self.sysfs().hwmon_dir(index).join(paths::HWMON_VALUE);
        self.put(path, &format!("{}\n", raw));
    }

    /// Add `cpu<index>` with capability bounds in kHz; the ceiling starts at max
    pub fn add_cpu(&self, index: usize, min_khz: i64, max_khz: i64) {
        let sysfs = self.sysfs();
        self.put(sysfs.cpufreq_file(index, paths::CPUINFO_MIN_FREQ), &format!("{}\n", min_khz));
        self.put(sysfs.cpufreq_file(index, paths::CPUINFO_MAX_FREQ), &format!("{}\n", max_khz));
        self.put(sysfs.cpufreq_file(index, paths::SCALING_MAX_FREQ), &format!("{}\n", max_khz));
        self.put(sysfs.cpufreq_file(index, paths::SCALING_CUR_FREQ), &format!("{}\n", min_khz));
    }

    pub fn set_scaling_max_khz(&self, index: usize, khz: i64) {
        let path = self.sysfs().cpufreq_file(index, paths::SCALING_MAX_FREQ);
        self.put(path, &format!("{}\n", khz));
    }

    pub fn set_cur_khz(&self, index: usize, khz: i64) {
        let path = self.sysfs().cpufreq_file(index, paths::SCALING_CUR_FREQ);
        self.put(path, &format!("{}\n", khz));
    }

    pub fn scaling_max_khz(&self, index: usize) -> Option<i64> {
        crate::hw::read_scalar(&self.sysfs().cpufreq_file(index, paths::SCALING_MAX_FREQ))
    }
}

impl Default for FakeSysfs {
    fn default() -> Self {
        Self::new()
    }
}
