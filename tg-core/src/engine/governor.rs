//! Feedback controller state machine
//!
//! [`Governor::tick`] performs one control iteration: sample, compute, clamp,
//! actuate, verify, update state. Sleeping between iterations belongs to the
//! caller so the same governor can run under any scheduler.
//!
//! The governor starts `Uninitialized`. The first successful sample moves it
//! to `Running`, seeding the previous temperature with that same sample (zero
//! initial derivative) and the previous command with the ceiling currently in
//! force. That transition happens exactly once.

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::constants::control;
use crate::engine::pd::{ControlState, PdController};
use crate::error::ThermgovError;
use crate::hw::{set_ceiling_verified, Actuator, SensorHandle};

/// A readable temperature in °C
#[cfg_attr(test, mockall::automock)]
pub trait TemperatureSource {
    fn read_celsius(&self) -> Option<f64>;
}

impl TemperatureSource for SensorHandle {
    fn read_celsius(&self) -> Option<f64> {
        SensorHandle::read_celsius(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlPhase {
    Uninitialized,
    Running(ControlState),
}

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Sampled temperature in °C
    pub temperature: f64,
    /// Unclamped law output in Hz
    pub raw_hz: f64,
    /// Issued ceiling in Hz
    pub command_hz: f64,
}

#[derive(Debug)]
pub enum TickOutcome {
    /// Command issued and confirmed by read-back
    Applied { tick: Tick, cores: usize },
    /// Command issued but the read-back did not confirm it; retried next period
    Unverified { tick: Tick, error: ThermgovError },
    /// No temperature this period; state left untouched
    SensorUnavailable,
}

pub struct Governor<S, A> {
    sensor: S,
    actuator: A,
    controller: PdController,
    phase: ControlPhase,
    verify_attempts: u32,
    verify_delay: Duration,
}

impl<S, A> Governor<S, A>
where
    S: TemperatureSource,
    A: Actuator,
{
    pub fn new(sensor: S, actuator: A, controller: PdController) -> Self {
        Self {
            sensor,
            actuator,
            controller,
            phase: ControlPhase::Uninitialized,
            verify_attempts: control::VERIFY_ATTEMPTS,
            verify_delay: control::VERIFY_DELAY,
        }
    }

    /// Override the steady-state read-back budget
    pub fn with_verify_budget(mut self, attempts: u32, delay: Duration) -> Self {
        self.verify_attempts = attempts;
        self.verify_delay = delay;
        self
    }

    pub fn phase(&self) -> &ControlPhase {
        &self.phase
    }

    pub fn controller(&self) -> &PdController {
        &self.controller
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    fn initial_state(&self, temperature: f64) -> ControlState {
        let bounds = self.controller.bounds();
        let enforced = match self.actuator.current_ceiling() {
            Some(hz) => bounds.clamp(hz),
            None => {
                warn!("Enforced ceiling unreadable at start, assuming maximum");
                bounds.max()
            }
        };
        debug!(temperature, ceiling_hz = enforced, "Controller running");
        ControlState {
            previous_temperature: temperature,
            previous_command: enforced,
        }
    }

    /// Run one control iteration
    pub fn tick(&mut self) -> TickOutcome {
        let Some(temperature) = self.sensor.read_celsius() else {
            debug!("Temperature unavailable, skipping iteration");
            return TickOutcome::SensorUnavailable;
        };

        let state = match self.phase {
            ControlPhase::Uninitialized => self.initial_state(temperature),
            ControlPhase::Running(state) => state,
        };

        let raw_hz = self.controller.raw_command(&state, temperature);
        let command_hz = self.controller.bounds().clamp(raw_hz);
        let tick = Tick {
            temperature,
            raw_hz,
            command_hz,
        };
        trace!(temperature, raw_hz, command_hz, "Computed command");

        let result = set_ceiling_verified(
            &self.actuator,
            command_hz,
            self.verify_attempts,
            self.verify_delay,
        );

        self.phase = ControlPhase::Running(ControlState {
            previous_temperature: temperature,
            previous_command: command_hz,
        });

        match result {
            Ok(cores) => TickOutcome::Applied { tick, cores },
            Err(error) => TickOutcome::Unverified { tick, error },
        }
    }
}
