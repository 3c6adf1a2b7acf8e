//! Control engine modules
//!
//! The PD frequency law and the governor state machine that drives it.

mod governor;
mod pd;

pub use governor::{ControlPhase, Governor, TemperatureSource, Tick, TickOutcome};
pub use pd::{ControlState, PdController, PdGains};
