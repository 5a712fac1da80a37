//! Configuration for the rclonevol plugin.

use std::path::PathBuf;

use rclonevol_shared::constants::{envs, layout, plugin, provider};
use rclonevol_shared::errors::{VolumeError, VolumeResult};
use serde::{Deserialize, Serialize};

/// Options used when starting the plugin.
///
/// Read once at startup; changing them requires a restart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PluginOptions {
    /// Root directory holding `volumes/` and `state/`.
    ///
    /// Default: `$RCLONEVOL_ROOT`, falling back to `/mnt`.
    pub root_dir: PathBuf,

    /// Unix socket Docker connects to.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// rclone executable.
    #[serde(default = "default_rclone_binary")]
    pub rclone_binary: PathBuf,

    /// Remote profile written by `rclone config create` and mounted as `<profile>:`.
    #[serde(default = "default_profile")]
    pub profile: String,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(plugin::SOCKET_PATH)
}

fn default_rclone_binary() -> PathBuf {
    PathBuf::from(provider::BINARY)
}

fn default_profile() -> String {
    provider::PROFILE.to_string()
}

impl PluginOptions {
    /// Check preconditions before any directory is touched.
    pub fn validate(&self) -> VolumeResult<()> {
        if !self.root_dir.is_absolute() {
            return Err(VolumeError::Config(format!(
                "root_dir must be absolute path, got: {}",
                self.root_dir.display()
            )));
        }

        if self.profile.is_empty() || self.profile.contains(':') {
            return Err(VolumeError::Config(format!(
                "invalid rclone profile name '{}'",
                self.profile
            )));
        }

        Ok(())
    }
}

impl Default for PluginOptions {
    fn default() -> Self {
        let root_dir = std::env::var(envs::ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(layout::ROOT_DIR));

        Self {
            root_dir,
            socket_path: default_socket_path(),
            rclone_binary: default_rclone_binary(),
            profile: default_profile(),
        }
    }
}
