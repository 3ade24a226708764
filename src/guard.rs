//! Single-instance lock and the run marker.
//!
//! The lock is an `fs2` advisory lock taken without blocking; the kernel
//! drops it when the process exits, however it exits. The run marker is
//! a plain file holding the start timestamp, used only to tell a fresh
//! start from a restart after an unclean exit.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::GuardError;

/// Exit status used when another instance holds the lock.
pub const EXIT_ALREADY_RUNNING: i32 = 3;

/// Holds the process-wide lock for as long as it lives.
///
/// Dropping the guard releases the lock and removes the lock file.
#[derive(Debug)]
pub struct InstanceGuard {
    file: File,
    path: PathBuf,
}

impl InstanceGuard {
    /// Try to take the lock at `path` without blocking.
    ///
    /// Returns [`GuardError::AlreadyRunning`] if another process holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, GuardError> {
        let path = path.into();

        // Open without truncation so a running instance's pid survives a failed attempt
        #[allow(clippy::suspicious_open_options)]
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(GuardError::AlreadyRunning(path));
        }

        file.set_len(0)?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;

        debug!("Acquired instance lock {}", path.display());
        Ok(Self { file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
        let _ = self.file.unlock();
    }
}

/// How this process came up, judged from the run marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartKind {
    /// No marker was left behind: first start or previous clean shutdown.
    Fresh,
    /// A marker survived, so the previous run ended without cleaning up.
    Restarted,
}

impl StartKind {
    /// The notification announcing this start.
    pub fn announcement(&self) -> &'static str {
        match self {
            StartKind::Fresh => "The notification service has started for the first time.",
            StartKind::Restarted => "The notification service has been restarted.",
        }
    }
}

/// Marker file present while the monitor runs.
#[derive(Debug)]
pub struct RunMarker {
    path: PathBuf,
}

impl RunMarker {
    /// Inspect the marker at `path`, then (re)write it with the current time.
    pub fn mark(path: impl Into<PathBuf>) -> Result<(Self, StartKind), GuardError> {
        let path = path.into();
        let kind = if path.exists() {
            StartKind::Restarted
        } else {
            StartKind::Fresh
        };

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        std::fs::write(&path, format!("{:.3}", now))?;

        Ok((Self { path }, kind))
    }

    /// Remove the marker on clean shutdown.
    pub fn clear(self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Failed to remove run marker {}: {}", self.path.display(), e);
            }
        }
    }
}
