//! Daemon lifecycle
//!
//! # Lock identity
//!
//! A single instance runs per pid file. The file is held with an exclusive
//! `flock` for the lifetime of the instance and carries the holder's PID so a
//! newcomer can ask it to stop. The kernel drops the lock when the holder
//! exits, however it exits, so a stale file never blocks a restart.
//!
//! A lock only counts if the locked inode is still the one at the path. The
//! holder unlinks the file on release, and a newcomer that opened the old
//! inode just before that would otherwise lock a file nobody else can see.
//! The contents are cleared on acquisition; a PID left by a killed holder
//! must never be signalled.
//!
//! # Recovery obligation
//!
//! Once the capability check has passed, the process is responsible for the
//! ceiling. [`RecoveryGuard`] owns that obligation together with the lock:
//! dropping it writes the maximum ceiling back and only then releases the
//! lock, so a successor never starts while the system is still throttled.
//! Until the loop's signal streams exist, [`DeferredSignals`] keeps
//! termination signals pending so they cannot kill the process mid-check.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::mem;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;
use std::thread;
use std::time::Duration;

use tg_core::constants::lock;
use tg_core::{Actuator, Result, ThermgovError};
use tracing::{debug, info, warn};

/// How hard to try before declaring the lock contended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockBudget {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for LockBudget {
    fn default() -> Self {
        Self {
            attempts: lock::ACQUIRE_ATTEMPTS,
            backoff: lock::ACQUIRE_BACKOFF,
        }
    }
}

/// Result of one non-blocking acquisition attempt
#[derive(Debug)]
pub enum LockAttempt {
    Acquired(PidLock),
    /// Someone else holds the lock; `pid` is whatever their file says
    Held { pid: Option<i32> },
}

/// An exclusively held pid file
#[derive(Debug)]
pub struct PidLock {
    file: File,
    path: PathBuf,
}

impl PidLock {
    /// Try to take the lock without blocking
    ///
    /// On success the file is emptied; the PID is written later by
    /// [`PidLock::write_pid`].
    pub fn try_acquire(path: &Path) -> Result<LockAttempt> {
        let lock_err = |source: io::Error| ThermgovError::Lock {
            path: path.to_path_buf(),
            source,
        };

        for _ in 0..lock::REOPEN_ATTEMPTS {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .mode(lock::FILE_MODE)
                .open(path)
                .map_err(lock_err)?;

            // SAFETY: the descriptor is owned by `file` and open for this whole call.
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc != 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::EWOULDBLOCK) {
                    return Err(lock_err(err));
                }

                let mut content = String::new();
                let pid = file
                    .read_to_string(&mut content)
                    .ok()
                    .and_then(|_| parse_pid(&content));
                return Ok(LockAttempt::Held { pid });
            }

            if !is_linked(&file, path) {
                debug!(path = %path.display(), "PID file replaced while locking, reopening");
                continue;
            }

            file.set_len(0).map_err(lock_err)?;
            debug!(path = %path.display(), "Lock acquired");
            return Ok(LockAttempt::Acquired(Self {
                file,
                path: path.to_path_buf(),
            }));
        }

        // The file keeps changing hands; report it as held by someone unknown
        Ok(LockAttempt::Held { pid: None })
    }

    /// Take the lock, asking the current holder to stop if there is one
    ///
    /// `request_stop` is called with the holder's PID on every contended
    /// attempt; between attempts the caller sleeps for the budget's backoff.
    pub fn acquire_or_supersede<F>(path: &Path, budget: LockBudget, mut request_stop: F) -> Result<Self>
    where
        F: FnMut(i32),
    {
        let mut holder = None;

        for attempt in 0..budget.attempts.max(1) {
            match Self::try_acquire(path)? {
                LockAttempt::Acquired(lock) => return Ok(lock),
                LockAttempt::Held { pid } => {
                    debug!(attempt, ?pid, "Lock held by another instance");
                    if let Some(pid) = pid {
                        request_stop(pid);
                    }
                    holder = pid.or(holder);
                    thread::sleep(budget.backoff);
                }
            }
        }

        Err(ThermgovError::LockContended {
            path: path.to_path_buf(),
            pid: holder,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the calling process as the holder
    ///
    /// Must run after detaching, since detaching changes the PID.
    pub fn write_pid(&mut self) -> Result<()> {
        let write_err = |source: io::Error| ThermgovError::FileWrite {
            path: self.path.clone(),
            source,
        };
        let pid = std::process::id();

        self.file.set_len(0).map_err(write_err)?;
        self.file.seek(SeekFrom::Start(0)).map_err(write_err)?;
        writeln!(self.file, "{}", pid).map_err(write_err)?;
        self.file.sync_all().map_err(write_err)?;

        debug!(path = %self.path.display(), pid, "PID file written");
        Ok(())
    }

    /// Remove the pid file and drop the lock
    ///
    /// The path is only unlinked while it still names the file we hold.
    pub fn release(self) {
        if is_linked(&self.file, &self.path) {
            if let Err(e) = fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Failed to remove PID file");
                }
            }
        }
        debug!(path = %self.path.display(), "Lock released");
    }
}

/// Whether `path` currently names the same inode as `file`
fn is_linked(file: &File, path: &Path) -> bool {
    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(named)) => held.dev() == named.dev() && held.ino() == named.ino(),
        _ => false,
    }
}

fn parse_pid(content: &str) -> Option<i32> {
    content
        .split_whitespace()
        .next()
        .and_then(|tok| tok.parse::<i32>().ok())
        .filter(|pid| *pid > 0)
}

/// Ask the process `pid` to terminate cleanly
pub fn request_termination(pid: i32) {
    // SAFETY: kill has no memory-safety preconditions; pid was checked positive
    // by the pid file parser so this never signals a process group.
    if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
        debug!(pid, error = %io::Error::last_os_error(), "SIGTERM not delivered");
    }
}

/// Detach from the controlling terminal and continue in the background
///
/// The working directory becomes `/` and stdio is redirected to
/// `/dev/null`. Only the child returns; the parent exits immediately without
/// running destructors.
pub fn detach() -> Result<()> {
    // SAFETY: called before any runtime or extra thread exists.
    if unsafe { libc::daemon(0, 0) } == -1 {
        return Err(ThermgovError::Daemonize(io::Error::last_os_error().to_string()));
    }
    Ok(())
}

/// Termination signals held pending on the calling thread
///
/// SIGTERM, SIGINT and SIGHUP stay blocked while this is alive. Dropping it
/// restores the previous mask, which delivers anything that arrived in the
/// meantime, so the loop's signal streams must be registered first. The mask
/// is per thread and survives [`detach`].
pub struct DeferredSignals {
    previous: libc::sigset_t,
    _thread: PhantomData<*const ()>,
}

impl DeferredSignals {
    pub fn block() -> Result<Self> {
        // SAFETY: both sets are plain data, initialised by sigemptyset and
        // pthread_sigmask before they are read.
        unsafe {
            let mut set: libc::sigset_t = mem::zeroed();
            let mut previous: libc::sigset_t = mem::zeroed();
            libc::sigemptyset(&mut set);
            for sig in [libc::SIGTERM, libc::SIGINT, libc::SIGHUP] {
                libc::sigaddset(&mut set, sig);
            }
            let rc = libc::pthread_sigmask(libc::SIG_BLOCK, &set, &mut previous);
            if rc != 0 {
                return Err(ThermgovError::SignalMask(io::Error::from_raw_os_error(rc)));
            }
            Ok(Self {
                previous,
                _thread: PhantomData,
            })
        }
    }
}

impl Drop for DeferredSignals {
    fn drop(&mut self) {
        // SAFETY: `previous` was filled in by pthread_sigmask on this thread.
        let rc = unsafe { libc::pthread_sigmask(libc::SIG_SETMASK, &self.previous, ptr::null_mut()) };
        if rc != 0 {
            warn!(error = %io::Error::from_raw_os_error(rc), "Failed to restore signal mask");
        }
    }
}

/// Writes a safe ceiling back and releases the lock when dropped
///
/// Created before the capability check with the ceiling found at startup,
/// then pointed at the maximum once the check passes.
pub struct RecoveryGuard<A: Actuator> {
    actuator: A,
    restore_hz: f64,
    lock: Option<PidLock>,
}

impl<A: Actuator> RecoveryGuard<A> {
    pub fn new(actuator: A, restore_hz: f64, lock: Option<PidLock>) -> Self {
        Self {
            actuator,
            restore_hz,
            lock,
        }
    }

    pub fn restore_to(&mut self, hz: f64) {
        self.restore_hz = hz;
    }

    pub fn lock_mut(&mut self) -> Option<&mut PidLock> {
        self.lock.as_mut()
    }
}

impl<A: Actuator> Drop for RecoveryGuard<A> {
    fn drop(&mut self) {
        let cores = self.actuator.set_ceiling(self.restore_hz);
        if cores == 0 {
            warn!(hz = self.restore_hz, "Could not restore ceiling");
        } else {
            info!(hz = self.restore_hz, cores, "Restored ceiling");
        }

        if let Some(lock) = self.lock.take() {
            lock.release();
        }
    }
}
