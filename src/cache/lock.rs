//! Scoped advisory file locks
//!
//! Locks go through `File::lock` and friends, which use `flock(2)` on
//! unix and `LockFileEx` on Windows. They belong to the open file
//! description: two handles opened separately on the same path contend
//! even inside one process. The guard releases the lock on drop.

use crate::error::{CacheError, CacheResult};
use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// How long to sleep between non-blocking attempts under a timeout
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Lock mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many readers, no writers
    Shared,
    /// One writer, no readers
    Exclusive,
}

/// Acquisition policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockWait {
    /// Block until the holder releases, however long that takes
    #[default]
    Blocking,
    /// Give up with [`CacheError::LockTimeout`] after the duration
    Timeout(Duration),
}

impl LockWait {
    /// `None` keeps the unbounded behavior
    pub fn from_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) => Self::Timeout(Duration::from_secs(secs)),
            None => Self::Blocking,
        }
    }
}

/// Held lock on a file; unlocked when dropped
#[derive(Debug)]
pub struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    /// Lock `file` in the given mode. `path` is only used for errors.
    pub fn acquire(file: &'a File, path: &Path, mode: LockMode, wait: LockWait) -> CacheResult<Self> {
        match wait {
            LockWait::Blocking => {
                sys::lock(file, mode, true).map_err(|source| CacheError::Lock {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            LockWait::Timeout(limit) => {
                let started = Instant::now();
                loop {
                    match sys::lock(file, mode, false) {
                        Ok(()) => break,
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                            if started.elapsed() >= limit {
                                return Err(CacheError::LockTimeout {
                                    path: path.to_path_buf(),
                                    waited: started.elapsed(),
                                });
                            }
                            std::thread::sleep(POLL_INTERVAL);
                        }
                        Err(source) => {
                            return Err(CacheError::Lock {
                                path: path.to_path_buf(),
                                source,
                            })
                        }
                    }
                }
            }
        }
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        // Closing the descriptor would release it too
        if let Err(e) = sys::unlock(self.file) {
            debug!("Failed to release file lock: {}", e);
        }
    }
}

mod sys {
    use super::LockMode;
    use std::fs::{File, TryLockError};
    use std::io;

    /// Take the lock; `WouldBlock` when `block` is false and it is held
    pub fn lock(file: &File, mode: LockMode, block: bool) -> io::Result<()> {
        loop {
            let result = match (mode, block) {
                (LockMode::Shared, true) => file.lock_shared(),
                (LockMode::Exclusive, true) => file.lock(),
                (LockMode::Shared, false) => try_result(file.try_lock_shared()),
                (LockMode::Exclusive, false) => try_result(file.try_lock()),
            };
            match result {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    pub fn unlock(file: &File) -> io::Result<()> {
        file.unlock()
    }

    fn try_result(result: Result<(), TryLockError>) -> io::Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(TryLockError::WouldBlock) => Err(io::ErrorKind::WouldBlock.into()),
            Err(TryLockError::Error(e)) => Err(e),
        }
    }
}
