//! Exclusive advisory lock on the target root.
//!
//! One run per target root: the lock file is created next to the snapshots
//! and `flock`ed without blocking.  The guard releases on every exit path,
//! including panics and early `?` returns.

use std::fs::{File, OpenOptions};
use std::path::Path;

use rustix::fs::{FlockOperation, flock};

use crate::errors::{BlueError, errno_detail, errno_detail_path};

/// Held for the duration of a run; dropping it releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl LockGuard {
    /// Acquire the lock at `path`, creating the file if absent.
    ///
    /// Contention surfaces as
    /// `Failed locking <p>: [Errno 11] Resource temporarily unavailable`.
    pub fn acquire(path: &Path) -> Result<Self, BlueError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|err| BlueError::Lock {
                path: path.display().to_string(),
                detail: errno_detail_path(&err, path.display()),
            })?;

        flock(&file, FlockOperation::NonBlockingLockExclusive).map_err(|errno| {
            BlueError::Lock {
                path: path.display().to_string(),
                detail: errno_detail(&std::io::Error::from(errno)),
            }
        })?;

        Ok(Self { file })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = flock(&self.file, FlockOperation::Unlock);
    }
}
