//! Sensor resolution
//!
//! Maps a human-chosen sensor id (a thermal zone `type` or an hwmon `name`)
//! to one concrete temperature file. Resolution runs once at startup; the
//! resulting [`SensorHandle`] is immutable for the life of the process.
//!
//! # Namespaces
//!
//! Scanned in this order, each from index 0 until the first index whose name
//! file is absent:
//!
//! 1. `thermal_zoneN/type` with value `thermal_zoneN/temp`
//! 2. `hwmonN/name` with value `hwmonN/temp1_input`
//!
//! # Duplicate ids
//!
//! Several nodes can share an id (one `coretemp` per package, for example).
//! The **last** matching node in namespace-then-index order wins, so an hwmon
//! node beats a thermal zone of the same name and a higher index beats a lower
//! one. A node only counts as a match if its value file is readable right now.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::constants::{paths, scan as scan_limits};
use crate::data::{SensorNamespace, SensorReading};
use crate::error::{Result, ThermgovError};
use crate::hw::scan::scan_contiguous;
use crate::hw::sysfs::{self, Sysfs};

/// A resolved, readable temperature source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorHandle {
    id: String,
    namespace: SensorNamespace,
    index: usize,
    path: PathBuf,
}

impl SensorHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn namespace(&self) -> SensorNamespace {
        self.namespace
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Path of the millidegree value file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current temperature in °C, `None` if momentarily unreadable
    pub fn read_celsius(&self) -> Option<f64> {
        sysfs::read_celsius(&self.path)
    }
}

/// One node seen during a namespace scan
struct Node {
    namespace: SensorNamespace,
    index: usize,
    name: String,
    value_path: PathBuf,
}

fn scan_namespace<'a>(
    sysfs: &'a Sysfs,
    namespace: SensorNamespace,
) -> impl Iterator<Item = Node> + 'a {
    let (limit, name_file, value_file) = match namespace {
        SensorNamespace::ThermalZone => (
            scan_limits::MAX_THERMAL_ZONES,
            paths::THERMAL_ZONE_NAME,
            paths::THERMAL_ZONE_VALUE,
        ),
        SensorNamespace::Hwmon => (
            scan_limits::MAX_HWMON_NODES,
            paths::HWMON_NAME,
            paths::HWMON_VALUE,
        ),
    };

    scan_contiguous(limit, move |index| {
        let dir = match namespace {
            SensorNamespace::ThermalZone => sysfs.thermal_zone_dir(index),
            SensorNamespace::Hwmon => sysfs.hwmon_dir(index),
        };
        let name = sysfs::read_line(&dir.join(name_file))?;
        Some(Node {
            namespace,
            index,
            name,
            value_path: dir.join(value_file),
        })
    })
}

fn all_nodes(sysfs: &Sysfs) -> impl Iterator<Item = Node> + '_ {
    scan_namespace(sysfs, SensorNamespace::ThermalZone)
        .chain(scan_namespace(sysfs, SensorNamespace::Hwmon))
}

/// Resolve `sensor_id` to a concrete temperature file
///
/// Fails with [`ThermgovError::SensorNotFound`] when no node with that exact
/// name has a readable value.
pub fn resolve(sysfs: &Sysfs, sensor_id: &str) -> Result<SensorHandle> {
    let mut chosen: Option<SensorHandle> = None;

    for node in all_nodes(sysfs).filter(|n| n.name == sensor_id) {
        if sysfs::read_scalar(&node.value_path).is_none() {
            debug!(
                sensor = sensor_id,
                path = %node.value_path.display(),
                "Matching node has no readable value, skipping"
            );
            continue;
        }

        debug!(
            sensor = sensor_id,
            namespace = %node.namespace,
            index = node.index,
            "Candidate sensor node"
        );
        chosen = Some(SensorHandle {
            id: node.name,
            namespace: node.namespace,
            index: node.index,
            path: node.value_path,
        });
    }

    match chosen {
        Some(handle) => {
            info!(sensor = sensor_id, path = %handle.path.display(), "Resolved sensor");
            Ok(handle)
        }
        None => Err(ThermgovError::SensorNotFound(sensor_id.to_string())),
    }
}

/// Every sensor node with a readable value, thermal zones first
pub fn list_sensors(sysfs: &Sysfs) -> Vec<SensorReading> {
    all_nodes(sysfs)
        .filter_map(|node| {
            let celsius = sysfs::read_celsius(&node.value_path)?;
            Some(SensorReading {
                id: node.name,
                namespace: node.namespace,
                index: node.index,
                path: node.value_path,
                celsius,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSysfs;

    #[test]
    fn test_resolve_single_hwmon() {
        let fake = FakeSysfs::new();
        fake.add_hwmon(0, "nvme", Some("38000"));
        fake.add_hwmon(1, "CPU", Some("45000"));

        let handle = resolve(&fake.sysfs(), "CPU").unwrap();
        assert_eq!(handle.namespace(), SensorNamespace::Hwmon);
        assert_eq!(handle.index(), 1);
        assert_eq!(handle.id(), "CPU");
        assert_eq!(handle.read_celsius(), Some(45.0));
    }

    #[test]
    fn test_resolve_thermal_zone() {
        let fake = FakeSysfs::new();
        fake.add_thermal_zone(0, "acpitz", Some("27800"));
        fake.add_thermal_zone(1, "x86_pkg_temp", Some("52000"));

        let handle = resolve(&fake.sysfs(), "x86_pkg_temp").unwrap();
        assert_eq!(handle.namespace(), SensorNamespace::ThermalZone);
        assert_eq!(handle.path(), fake.sysfs().thermal_zone_dir(1).join("temp"));
    }

    #[test]
    fn test_resolve_not_found() {
        let fake = FakeSysfs::new();
        fake.add_thermal_zone(0, "acpitz", Some("27800"));
        fake.add_hwmon(0, "nvme", Some("38000"));

        let err = resolve(&fake.sysfs(), "CPU").unwrap_err();
        assert!(matches!(err, ThermgovError::SensorNotFound(ref id) if id == "CPU"));
    }

    #[test]
    fn test_resolve_empty_tree() {
        let fake = FakeSysfs::new();
        assert!(resolve(&fake.sysfs(), "CPU").is_err());
    }

    #[test]
    fn test_last_match_wins() {
        let fake = FakeSysfs::new();
        fake.add_thermal_zone(0, "coretemp", Some("40000"));
        fake.add_hwmon(0, "coretemp", Some("41000"));
        fake.add_hwmon(1, "coretemp", Some("39000"));

        let handle = resolve(&fake.sysfs(), "coretemp").unwrap();
        assert_eq!(handle.namespace(), SensorNamespace::Hwmon);
        assert_eq!(handle.index(), 1);
    }

    #[test]
    fn test_unreadable_match_is_skipped() {
        let fake = FakeSysfs::new();
        fake.add_hwmon(0, "coretemp", Some("41000"));
        fake.add_hwmon(1, "coretemp", None);

        let handle = resolve(&fake.sysfs(), "coretemp").unwrap();
        assert_eq!(handle.index(), 0);
    }

    #[test]
    fn test_gap_ends_namespace_scan() {
        let fake = FakeSysfs::new();
        fake.add_hwmon(0, "nvme", Some("38000"));
        // hwmon1 missing: hwmon2 must never be seen
        fake.add_hwmon(2, "CPU", Some("45000"));

        assert!(resolve(&fake.sysfs(), "CPU").is_err());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let fake = FakeSysfs::new();
        fake.add_thermal_zone(0, "CPU", Some("50000"));
        fake.add_hwmon(0, "CPU", Some("45000"));

        let first = resolve(&fake.sysfs(), "CPU").unwrap();
        let second = resolve(&fake.sysfs(), "CPU").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_match_is_exact() {
        let fake = FakeSysfs::new();
        fake.add_hwmon(0, "CPUTIN", Some("45000"));
        assert!(resolve(&fake.sysfs(), "CPU").is_err());
        assert!(resolve(&fake.sysfs(), "cputin").is_err());
    }

    #[test]
    fn test_list_sensors_order_and_readability() {
        let fake = FakeSysfs::new();
        fake.add_thermal_zone(0, "acpitz", Some("27800"));
        fake.add_hwmon(0, "nvme", None);
        fake.add_hwmon(1, "coretemp", Some("45500"));

        let sensors = list_sensors(&fake.sysfs());
        let ids: Vec<&str> = sensors.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["acpitz", "coretemp"]);
        assert_eq!(sensors[0].namespace, SensorNamespace::ThermalZone);
        assert_eq!(sensors[1].celsius, 45.5);
    }
}
