//! Constants shared between the plugin daemon and its tooling.
//!
//! Paths and names here must stay stable across releases: Docker discovers the
//! plugin by socket name and previously written state files are reloaded on
//! restart.

/// Docker plugin protocol constants
pub mod plugin {
    /// Default socket Docker scans for the `rclone` volume driver
    pub const SOCKET_PATH: &str = "/run/docker/plugins/rclone.sock";

    /// Subsystem advertised by `/Plugin.Activate`
    pub const IMPLEMENTS: &str = "VolumeDriver";

    /// Volumes only exist on the host running the plugin
    pub const SCOPE_LOCAL: &str = "local";

    /// Create option selecting the rclone backend type
    pub const BACKEND_OPTION: &str = "backend";
}

/// Mount provider (rclone) invocation constants
pub mod provider {
    /// Default rclone binary location inside the plugin rootfs
    pub const BINARY: &str = "/rclone";

    /// Remote profile name written by `rclone config create`
    pub const PROFILE: &str = "mnt";
}

/// Filesystem layout under the plugin root
pub mod layout {
    /// Default plugin root directory
    pub const ROOT_DIR: &str = "/mnt";

    /// Subdirectory holding one mountpoint per distinct configuration
    pub const VOLUMES_DIR: &str = "volumes";

    /// Subdirectory holding the persisted registry snapshot
    pub const STATE_DIR: &str = "state";

    /// Snapshot file name
    pub const STATE_FILE: &str = "rclone-state.json";

    /// Single-instance lock file name
    pub const LOCK_FILE: &str = ".lock";
}

/// Environment variables
pub mod envs {
    /// Overrides the plugin root directory
    pub const ROOT: &str = "RCLONEVOL_ROOT";
}
