//! Single-instance run lock.
//!
//! The marker carries no owner information, so a marker left behind by a
//! crashed run blocks every later run until it is removed by hand.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::LockError;

/// Exclusivity guard for a run.
pub trait RunGuard: Send + Sync {
    /// Create the marker. `Ok(false)` means another run holds it.
    fn try_acquire(&self) -> Result<bool, LockError>;

    /// Remove the marker. Succeeds when it is already gone.
    fn release(&self) -> Result<(), LockError>;
}

/// Lock backed by a marker file.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Create a lock at `path`. Nothing touches the disk until acquired.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Marker path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> LockError {
        LockError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl RunGuard for FileLock {
    fn try_acquire(&self) -> Result<bool, LockError> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %self.path.display(), "Lock marker already present");
                return Ok(false);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        file.write_all(Utc::now().to_rfc3339().as_bytes())
            .map_err(|e| self.io_error(e))?;
        Ok(true)
    }

    fn release(&self) -> Result<(), LockError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-process lock for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLock {
    held: Arc<AtomicBool>,
}

impl MemoryLock {
    /// Create a free lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lock that is already held by someone else.
    pub fn held() -> Self {
        let lock = Self::default();
        lock.held.store(true, Ordering::SeqCst);
        lock
    }

    /// Whether the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl RunGuard for MemoryLock {
    fn try_acquire(&self) -> Result<bool, LockError> {
        Ok(self
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }

    fn release(&self) -> Result<(), LockError> {
        self.held.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Held lock; releases on drop.
pub struct LockHandle<'a> {
    guard: &'a dyn RunGuard,
    released: bool,
}

impl<'a> LockHandle<'a> {
    /// Acquire `guard`, returning `None` when it is already held.
    pub fn acquire(guard: &'a dyn RunGuard) -> Result<Option<Self>, LockError> {
        if !guard.try_acquire()? {
            return Ok(None);
        }
        info!("Run lock acquired");
        Ok(Some(Self {
            guard,
            released: false,
        }))
    }

    /// Release now and report the result.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.guard.release()?;
        info!("Run lock released");
        Ok(())
    }
}

impl Drop for LockHandle<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.guard.release() {
            Ok(()) => info!("Run lock released"),
            Err(e) => warn!(error = %e, "Failed to release run lock"),
        }
    }
}
