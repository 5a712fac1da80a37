//! Error types shared by the plugin core, the request handler and the CLI.

use thiserror::Error;

/// Result alias used throughout rclonevol.
pub type VolumeResult<T> = Result<T, VolumeError>;

/// Errors surfaced by volume operations.
///
/// The `Display` output of each variant is the message returned to the
/// container runtime, so caller-facing variants name the volume and the
/// failed precondition.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// A request is missing a required field or carries an invalid value.
    #[error("{0}")]
    InvalidArgument(String),

    /// No volume is registered under this name.
    #[error("volume {0} not found")]
    NotFound(String),

    /// The volume still has active mounts.
    #[error("volume {0} is currently used by a container")]
    InUse(String),

    /// Directory or state file operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The mount provider could not be configured, started or stopped.
    #[error("{0}")]
    Process(String),

    /// Invalid plugin configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal fault (e.g. a poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

impl VolumeError {
    /// Whether the error was caused by the request rather than the host.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            VolumeError::InvalidArgument(_) | VolumeError::NotFound(_) | VolumeError::InUse(_)
        )
    }
}
