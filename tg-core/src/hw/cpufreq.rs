//! Frequency actuator over the cpufreq sysfs interface
//!
//! All cores are driven to the same ceiling through their `scaling_max_freq`
//! files. Writes to these files can be silently ignored (insufficient
//! privilege, a driver rounding the value), so every command that matters is
//! confirmed by reading the ceiling back.

use std::fs::OpenOptions;
use std::io::Write;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::constants::{paths, scan};
use crate::data::FrequencyBounds;
use crate::error::{Result, ThermgovError};
use crate::hw::scan::scan_contiguous;
use crate::hw::sysfs::{self, Sysfs};

/// Something that can enforce a CPU frequency ceiling
#[cfg_attr(test, mockall::automock)]
pub trait Actuator {
    /// Write `hz` as the ceiling of every core; returns how many cores took the write
    fn set_ceiling(&self, hz: f64) -> usize;

    /// The ceiling currently enforced, as read back from a representative core
    fn current_ceiling(&self) -> Option<f64>;

    /// Hardware frequency envelope across all cores
    fn bounds(&self) -> Result<FrequencyBounds>;

    /// Highest current operating frequency across cores, for reporting only
    fn operating_frequency(&self) -> Option<f64>;
}

/// The real sysfs cpufreq interface
#[derive(Debug, Clone, Default)]
pub struct Cpufreq {
    sysfs: Sysfs,
}

impl Cpufreq {
    pub fn new(sysfs: Sysfs) -> Self {
        Self { sysfs }
    }

    /// Per-core values of one cpufreq file, in Hz, until the first unreadable core
    fn per_core_hz(&self, file: &'static str) -> impl Iterator<Item = f64> + '_ {
        scan_contiguous(scan::MAX_CPUS, move |cpu| {
            sysfs::read_hz(&self.sysfs.cpufreq_file(cpu, file))
        })
    }

    fn write_core(&self, cpu: usize, khz: i64) -> Option<()> {
        let path = self.sysfs.cpufreq_file(cpu, paths::SCALING_MAX_FREQ);
        // No create: a missing file means the core does not exist
        let mut file = OpenOptions::new().write(true).truncate(true).open(&path).ok()?;
        if let Err(e) = write!(file, "{}", khz) {
            warn!(cpu, path = %path.display(), error = %e, "Failed to write scaling_max_freq");
            return None;
        }
        Some(())
    }
}

impl Actuator for Cpufreq {
    fn set_ceiling(&self, hz: f64) -> usize {
        let khz = sysfs::hz_to_khz(hz);
        let written = scan_contiguous(scan::MAX_CPUS, |cpu| self.write_core(cpu, khz)).count();
        trace!(khz, cores = written, "Wrote scaling_max_freq");
        written
    }

    fn current_ceiling(&self) -> Option<f64> {
        sysfs::read_hz(&self.sysfs.cpufreq_file(0, paths::SCALING_MAX_FREQ))
    }

    fn bounds(&self) -> Result<FrequencyBounds> {
        let min = self
            .per_core_hz(paths::CPUINFO_MIN_FREQ)
            .fold(None, |acc: Option<f64>, f| Some(acc.map_or(f, |a| a.min(f))));
        let max = self
            .per_core_hz(paths::CPUINFO_MAX_FREQ)
            .fold(None, |acc: Option<f64>, f| Some(acc.map_or(f, |a| a.max(f))));

        match (min, max) {
            (Some(min), Some(max)) => {
                let bounds = FrequencyBounds::new(min, max).ok_or(ThermgovError::BoundsUnavailable)?;
                debug!(%bounds, "Discovered frequency bounds");
                Ok(bounds)
            }
            _ => Err(ThermgovError::BoundsUnavailable),
        }
    }

    fn operating_frequency(&self) -> Option<f64> {
        self.per_core_hz(paths::SCALING_CUR_FREQ).reduce(f64::max)
    }
}

/// Whether a read-back ceiling equals a command at the kHz resolution of the control file
pub fn ceiling_matches(observed: f64, commanded: f64) -> bool {
    sysfs::hz_to_khz(observed) == sysfs::hz_to_khz(commanded)
}

/// Command `hz` and poll the read-back until it matches
///
/// The read-back is checked right after the write and then up to `attempts`
/// more times, `delay` apart. Fails with [`ThermgovError::CeilingNotApplied`]
/// if no core accepted the write or the read-back never matched.
pub fn set_ceiling_verified<A>(actuator: &A, hz: f64, attempts: u32, delay: Duration) -> Result<usize>
where
    A: Actuator + ?Sized,
{
    let cores = actuator.set_ceiling(hz);
    if cores == 0 {
        return Err(ThermgovError::CeilingNotApplied {
            target_hz: hz,
            observed_hz: actuator.current_ceiling(),
        });
    }

    let mut observed = actuator.current_ceiling();
    for _ in 0..attempts {
        if observed.is_some_and(|o| ceiling_matches(o, hz)) {
            return Ok(cores);
        }
        thread::sleep(delay);
        observed = actuator.current_ceiling();
    }

    if observed.is_some_and(|o| ceiling_matches(o, hz)) {
        Ok(cores)
    } else {
        Err(ThermgovError::CeilingNotApplied {
            target_hz: hz,
            observed_hz: observed,
        })
    }
}
