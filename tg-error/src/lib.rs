//! Unified error handling for thermgov
//!
//! This crate provides the single error type used across the governor library
//! and binary. Telemetry reads that may legitimately be absent return `Option`
//! instead; this type covers the conditions a caller has to act on.

use std::io;
use std::path::PathBuf;

/// Result type alias using ThermgovError
pub type Result<T> = std::result::Result<T, ThermgovError>;

/// Unified error type for all thermgov operations
#[derive(thiserror::Error, Debug)]
pub enum ThermgovError {
    // ============================================================================
    // File System Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Hardware Discovery and Actuation Errors
    // ============================================================================
    #[error("Could not find sensor {0}")]
    SensorNotFound(String),

    #[error("No CPU reports cpuinfo_min_freq/cpuinfo_max_freq; frequency bounds unavailable")]
    BoundsUnavailable,

    #[error("Could not set scaling_max_freq to {target_hz} Hz (read back {})", format_observed(.observed_hz))]
    CeilingNotApplied {
        target_hz: f64,
        observed_hz: Option<f64>,
    },

    // ============================================================================
    // Lock Identity Errors
    // ============================================================================
    #[error("Could not stop already running instance ({}) holding {path}", format_pid(.pid))]
    LockContended {
        path: PathBuf,
        pid: Option<i32>,
    },

    #[error("Could not open lock file {path}: {source}")]
    Lock {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to detach into background: {0}")]
    Daemonize(String),

    #[error("Failed to block termination signals: {0}")]
    SignalMask(io::Error),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },
}

fn format_observed(observed: &Option<f64>) -> String {
    match observed {
        Some(hz) => format!("{} Hz", hz),
        None => "nothing".to_string(),
    }
}

fn format_pid(pid: &Option<i32>) -> String {
    match pid {
        Some(pid) => format!("PID {}", pid),
        None => "PID unknown".to_string(),
    }
}

impl ThermgovError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid configuration error for one field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a startup configuration problem, detected before
    /// any hardware was touched
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidConfig { .. } | Self::JsonParse(_)
        )
    }
}
