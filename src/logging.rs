//! Logging setup
//!
//! `tracing` output goes to the systemd journal when running as a daemon on a
//! systemd host, and to stderr otherwise. The filter comes from
//! `THERMGOV_LOG`.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "THERMGOV_LOG";

const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Journald,
}

/// Filter used when `THERMGOV_LOG` is unset
///
/// Foreground runs stay quiet so only verbose lines and fatal errors reach
/// the terminal.
pub fn default_filter(daemon: bool) -> &'static str {
    if daemon {
        "info"
    } else {
        "warn"
    }
}

fn filter_directive(daemon: bool) -> String {
    std::env::var(LOG_ENV).unwrap_or_else(|_| default_filter(daemon).to_string())
}

fn init_stderr(directive: &str) {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(directive))
        .init();
}

/// Install the global subscriber; call once, before any hardware access
pub fn init_logging(daemon: bool) -> LogTarget {
    let directive = filter_directive(daemon);

    if daemon && Path::new(JOURNALD_SOCKET).exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(EnvFilter::new(&directive))
                    .init();
                return LogTarget::Journald;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stderr", e);
            }
        }
    }

    init_stderr(&directive);
    LogTarget::Stderr
}
