//! Error types for tg-core
//!
//! Re-exports the shared error type from tg-error.

pub use tg_error::{Result, ThermgovError};
