//! rclone-backed mount controller.

use std::path::{Path, PathBuf};

use rclonevol_shared::errors::VolumeResult;

use super::spawn::{config_command, mount_command, run_config, spawn_mount};
use super::{MountController, MountProcess};
use crate::volumes::Volume;

/// Mounts volumes by configuring an rclone remote profile and running
/// `rclone mount` against it.
///
/// Every volume is written to the same profile right before its mount is
/// spawned. The registry lock serializes starts, and rclone reads its config
/// once at startup, so a later rewrite does not affect running mounts.
#[derive(Debug, Clone)]
pub struct RcloneController {
    binary: PathBuf,
    profile: String,
}

impl RcloneController {
    pub fn new(binary: PathBuf, profile: impl Into<String>) -> Self {
        Self {
            binary,
            profile: profile.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}

impl MountController for RcloneController {
    fn start(&self, volume: &Volume) -> VolumeResult<MountProcess> {
        run_config(config_command(
            &self.binary,
            &self.profile,
            &volume.backend,
            &volume.options,
        ))?;

        let child = spawn_mount(mount_command(
            &self.binary,
            &self.profile,
            &volume.mountpoint,
        ))?;

        tracing::info!(
            pid = child.id(),
            backend = %volume.backend,
            mountpoint = %volume.mountpoint.display(),
            "Started rclone mount"
        );

        MountProcess::new(child)
    }
}
