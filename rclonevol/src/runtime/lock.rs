//! Single-instance lock for the plugin root directory.
//!
//! Two daemons sharing a root would each believe they own every mount
//! process and overwrite each other's state file. An advisory `flock` on
//! `<root>/.lock` rules that out; the OS drops it when the process exits.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use rclonevol_shared::constants::layout::LOCK_FILE;
use rclonevol_shared::errors::{VolumeError, VolumeResult};

/// Exclusive lock on a plugin root, held until dropped.
pub struct RuntimeLock {
    _flock: Flock<File>,
    path: PathBuf,
}

impl RuntimeLock {
    /// Lock `root_dir`, failing immediately if another instance holds it.
    ///
    /// # Errors
    /// * `VolumeError::Config` - another plugin instance holds the lock
    /// * `VolumeError::Storage` - the lock file could not be created or locked
    pub fn acquire(root_dir: &Path) -> VolumeResult<Self> {
        std::fs::create_dir_all(root_dir).map_err(|e| {
            VolumeError::Storage(format!(
                "failed to create root dir {}: {}",
                root_dir.display(),
                e
            ))
        })?;

        let path = root_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| {
                VolumeError::Storage(format!("failed to open {}: {}", path.display(), e))
            })?;

        let flock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => flock,
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => {
                return Err(VolumeError::Config(format!(
                    "another rclonevol plugin is already using directory: {}",
                    root_dir.display()
                )));
            }
            Err((_, errno)) => {
                return Err(VolumeError::Storage(format!(
                    "failed to lock {}: {}",
                    path.display(),
                    errno
                )));
            }
        };

        tracing::debug!(lock_path = %path.display(), "Acquired plugin lock");

        Ok(Self {
            _flock: flock,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RuntimeLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeLock").field("path", &self.path).finish()
    }
}
