//! Startup capability check
//!
//! Before the control loop is trusted to run unattended, prove the ceiling
//! can actually be moved: command the minimum bound and wait for the
//! read-back, then the maximum bound and wait again. The system is left at
//! full performance when the check passes.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::constants::capability;
use crate::data::FrequencyBounds;
use crate::error::Result;
use crate::hw::cpufreq::{set_ceiling_verified, Actuator};

/// Read-back polling budget for each stage of the check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityBudget {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for CapabilityBudget {
    fn default() -> Self {
        Self {
            attempts: capability::POLL_ATTEMPTS,
            delay: capability::POLL_DELAY,
        }
    }
}

/// Verify the actuator can reach both ends of `bounds`
///
/// On failure the ceiling found before the check is written back on a
/// best-effort basis and the verification error is returned; callers must
/// treat it as fatal.
pub fn check_actuation<A>(actuator: &A, bounds: &FrequencyBounds, budget: CapabilityBudget) -> Result<()>
where
    A: Actuator + ?Sized,
{
    let original = actuator.current_ceiling();

    for (stage, target) in [("min", bounds.min()), ("max", bounds.max())] {
        match set_ceiling_verified(actuator, target, budget.attempts, budget.delay) {
            Ok(cores) => {
                info!(stage, hz = target, cores, "Ceiling verified");
            }
            Err(e) => {
                error!(stage, error = %e, "Capability check failed");
                if let Some(hz) = original {
                    if actuator.set_ceiling(hz) == 0 {
                        warn!(hz, "Could not restore original ceiling");
                    }
                }
                return Err(e);
            }
        }
    }

    Ok(())
}
