//! Mount provider process management.
//!
//! A [`MountController`] turns an unmounted [`Volume`] into a running mount
//! process and back. The registry owns the resulting [`MountProcess`] through
//! the volume entity; nothing else may signal it.

mod log_stream;
mod rclone;
mod spawn;

use std::process::{Child, ExitStatus};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use rclonevol_shared::errors::{VolumeError, VolumeResult};

use crate::volumes::Volume;
use log_stream::LogStreamHandler;

pub use rclone::RcloneController;

/// Starts and stops the process backing a volume's mountpoint.
///
/// Both calls run while the registry's exclusive lock is held.
pub trait MountController: Send + Sync {
    /// Start the mount process for `volume`.
    ///
    /// Returns as soon as the process is spawned; the mount may still be
    /// coming up when the caller starts using the mountpoint.
    fn start(&self, volume: &Volume) -> VolumeResult<MountProcess>;

    /// Terminate `process` and wait for it to exit.
    fn stop(&self, process: MountProcess) -> VolumeResult<()> {
        process.terminate().map(|_| ())
    }
}

/// Owned handle to a running mount process.
///
/// Holds the child and, when its output is piped, the threads forwarding
/// that output to `tracing`.
pub struct MountProcess {
    child: Child,
    log_handler: Option<LogStreamHandler>,
}

impl MountProcess {
    /// Take ownership of a spawned child.
    ///
    /// Piped stdout/stderr are forwarded to `tracing` under target `rclone`.
    pub fn new(mut child: Child) -> VolumeResult<Self> {
        let log_handler = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => match LogStreamHandler::new(stdout, stderr) {
                Ok(handler) => Some(handler),
                Err(e) => {
                    // Nobody would own the child otherwise
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e);
                }
            },
            _ => None,
        };

        Ok(Self { child, log_handler })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Send SIGTERM and reap the process.
    ///
    /// Consumes the handle: whatever the outcome, the process is no longer
    /// owned by anyone afterwards.
    pub fn terminate(mut self) -> VolumeResult<ExitStatus> {
        let pid = self.pid();

        signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(|e| {
            VolumeError::Process(format!("failed to signal mount process {}: {}", pid, e))
        })?;

        let status = self.child.wait().map_err(|e| {
            VolumeError::Process(format!("failed to wait for mount process {}: {}", pid, e))
        })?;

        tracing::debug!(pid, status = %status, "Mount process exited");

        // Readers finish on their own once the pipes close
        drop(self.log_handler.take());

        Ok(status)
    }
}

impl std::fmt::Debug for MountProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountProcess")
            .field("pid", &self.pid())
            .field("log_forwarding", &self.log_handler.is_some())
            .finish()
    }
}
