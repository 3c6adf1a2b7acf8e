//! thermgov - closed-loop CPU thermal governor for Linux
//!
//! The binary's building blocks: command line, logging, daemon lifecycle,
//! the async control loop and the run modes that tie them together. The
//! sensor, actuator and control law live in `tg-core`.

pub mod app;
pub mod cli;
pub mod control_loop;
pub mod daemon;
pub mod logging;
