//! Proportional–derivative frequency law
//!
//! Each period the next ceiling is computed incrementally from the previous
//! command:
//!
//! ```text
//! f' = f_prev + Kp * (target - T) - Kd * (T - T_prev)
//! ```
//!
//! then clamped into the hardware bounds. The derivative term damps the
//! overshoot caused by the lag of the heatsink's thermal mass. There is no
//! integral term; a small steady-state offset is accepted instead of integral
//! windup against the clamp.
//!
//! Gains are given per second of control period and scaled linearly by the
//! period, so the step response does not depend on how often the loop runs.

use std::time::Duration;

use crate::constants::control;
use crate::data::FrequencyBounds;

/// Effective gains in Hz per °C for one control period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdGains {
    pub proportional: f64,
    pub derivative: f64,
}

impl PdGains {
    /// Scale per-second reference gains to a control period
    pub fn for_period(proportional_per_sec: f64, derivative_per_sec: f64, period: Duration) -> Self {
        let secs = period.as_secs_f64();
        Self {
            proportional: proportional_per_sec * secs,
            derivative: derivative_per_sec * secs,
        }
    }

    /// Reference gains (2×10^7 Hz/°C per second) for a control period
    pub fn reference(period: Duration) -> Self {
        Self::for_period(
            control::DEFAULT_PROPORTIONAL_GAIN,
            control::DEFAULT_DERIVATIVE_GAIN,
            period,
        )
    }
}

/// State carried from one iteration to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    /// Last temperature sample in °C
    pub previous_temperature: f64,
    /// Last commanded ceiling in Hz
    pub previous_command: f64,
}

/// Stateless PD law bound to a target and a frequency envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdController {
    gains: PdGains,
    target_celsius: f64,
    bounds: FrequencyBounds,
}

impl PdController {
    pub fn new(gains: PdGains, target_celsius: f64, bounds: FrequencyBounds) -> Self {
        Self {
            gains,
            target_celsius,
            bounds,
        }
    }

    pub fn gains(&self) -> PdGains {
        self.gains
    }

    pub fn target(&self) -> f64 {
        self.target_celsius
    }

    pub fn bounds(&self) -> &FrequencyBounds {
        &self.bounds
    }

    /// The unclamped next frequency
    pub fn raw_command(&self, state: &ControlState, temperature: f64) -> f64 {
        let error = self.target_celsius - temperature;
        let rate = temperature - state.previous_temperature;
        state.previous_command + self.gains.proportional * error - self.gains.derivative * rate
    }

    /// The next frequency, always within bounds
    pub fn command(&self, state: &ControlState, temperature: f64) -> f64 {
        self.bounds.clamp(self.raw_command(state, temperature))
    }
}
