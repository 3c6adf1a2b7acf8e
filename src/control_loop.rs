//! Control loop runner
//!
//! Drives [`Governor::tick`] once per period on a current-thread runtime. The
//! blocking sysfs work of an iteration runs to completion before the loop
//! waits, so a stop request is only ever observed between iterations and
//! cleanup never races an in-flight ceiling write.

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use tg_core::constants::control::MAX_CONSECUTIVE_ERRORS;
use tg_core::{Actuator, Governor, TemperatureSource, Tick, TickOutcome};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, info, trace, warn};

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Terminate,
    Interrupt,
    Hangup,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopSignal::Terminate => write!(f, "SIGTERM"),
            StopSignal::Interrupt => write!(f, "SIGINT"),
            StopSignal::Hangup => write!(f, "SIGHUP"),
        }
    }
}

/// Termination signal streams, registered up front so no signal between
/// registration and the first wait falls through to the default action
pub struct Signals {
    terminate: Signal,
    interrupt: Signal,
    hangup: Signal,
}

impl Signals {
    /// Must be called inside a runtime
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    pub async fn recv(&mut self) -> StopSignal {
        tokio::select! {
            _ = self.terminate.recv() => StopSignal::Terminate,
            _ = self.interrupt.recv() => StopSignal::Interrupt,
            _ = self.hangup.recv() => StopSignal::Hangup,
        }
    }
}

/// Totals for one run of the loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSummary {
    pub stop: StopSignal,
    pub iterations: u64,
    pub applied: u64,
}

/// One verbose status line
pub fn status_line(tick: &Tick, operating_hz: Option<f64>, ceiling_hz: Option<f64>, target: f64) -> String {
    let mhz = |hz: Option<f64>| match hz {
        Some(hz) => format!("{} MHz", hz / 1_000_000.0),
        None => "? MHz".to_string(),
    };
    format!(
        "CPU freq = {}, scaling_max_freq = {}, CPU temp = {} C, target temp = {} C",
        mhz(operating_hz),
        mhz(ceiling_hz),
        tick.temperature,
        target
    )
}

fn report<S, A>(governor: &Governor<S, A>, tick: &Tick)
where
    S: TemperatureSource,
    A: Actuator,
{
    let actuator = governor.actuator();
    println!(
        "{}",
        status_line(
            tick,
            actuator.operating_frequency(),
            actuator.current_ceiling(),
            governor.controller().target()
        )
    );
}

fn note_failure(consecutive: u32, what: &str, error: Option<&dyn fmt::Display>) {
    if consecutive == 1 || consecutive % MAX_CONSECUTIVE_ERRORS == 0 {
        match error {
            Some(e) => warn!(count = consecutive, error = %e, "{}", what),
            None => warn!(count = consecutive, "{}", what),
        }
    } else {
        debug!(count = consecutive, "{}", what);
    }
}

/// Run the governor every `period` until `shutdown` resolves
pub async fn run_until<S, A, F>(
    governor: &mut Governor<S, A>,
    period: Duration,
    verbose: bool,
    shutdown: F,
) -> LoopSummary
where
    S: TemperatureSource,
    A: Actuator,
    F: Future<Output = StopSignal>,
{
    tokio::pin!(shutdown);

    let mut consecutive_errors: u32 = 0;
    let mut iterations: u64 = 0;
    let mut applied: u64 = 0;

    info!(period_secs = period.as_secs_f64(), "Control loop started");

    loop {
        iterations += 1;

        match governor.tick() {
            TickOutcome::Applied { tick, cores } => {
                if consecutive_errors > 0 {
                    debug!("Control loop recovered after {} errors", consecutive_errors);
                    consecutive_errors = 0;
                }
                applied += 1;
                trace!(temperature = tick.temperature, hz = tick.command_hz, cores, "Ceiling applied");
                if verbose {
                    report(governor, &tick);
                }
            }
            TickOutcome::Unverified { tick, error } => {
                consecutive_errors += 1;
                note_failure(consecutive_errors, "Ceiling write not confirmed", Some(&error));
                if verbose {
                    report(governor, &tick);
                }
            }
            TickOutcome::SensorUnavailable => {
                consecutive_errors += 1;
                note_failure(consecutive_errors, "Temperature unavailable", None);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            stop = &mut shutdown => {
                info!(signal = %stop, iterations, "Control loop stopping");
                return LoopSummary {
                    stop,
                    iterations,
                    applied,
                };
            }
        }
    }
}
