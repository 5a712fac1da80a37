//! Command construction and spawning for the rclone binary.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use rclonevol_shared::errors::{VolumeError, VolumeResult};

/// `rclone config create <profile> <backend> [key | key value]...`
pub(super) fn config_command(
    binary: &Path,
    profile: &str,
    backend: &str,
    options: &BTreeMap<String, String>,
) -> Command {
    let mut cmd = Command::new(binary);
    cmd.arg("config").arg("create").arg(profile).arg(backend);

    for (key, value) in options {
        cmd.arg(key);
        if !value.is_empty() {
            cmd.arg(value);
        }
    }

    cmd.stdin(Stdio::null());
    cmd
}

/// `rclone mount <profile>: <mountpoint>`
pub(super) fn mount_command(binary: &Path, profile: &str, mountpoint: &Path) -> Command {
    let mut cmd = Command::new(binary);
    cmd.arg("mount").arg(format!("{}:", profile)).arg(mountpoint);

    // Piped so the output can be re-logged through tracing
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd
}

/// Run the configure step to completion.
///
/// # Errors
///
/// Returns `Process` if rclone cannot be executed or exits non-zero; the
/// message carries the exit status and everything rclone printed.
pub(super) fn run_config(mut cmd: Command) -> VolumeResult<()> {
    tracing::debug!(args = ?cmd.get_args().collect::<Vec<_>>(), "rclone config");

    let output = cmd.output().map_err(|e| {
        VolumeError::Process(format!("rclone config command execute failed: {}", e))
    })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(VolumeError::Process(format!(
            "rclone config command execute failed: {} ({})",
            output.status,
            combined.trim()
        )));
    }

    tracing::debug!(output = %combined.trim(), "rclone configured");
    Ok(())
}

/// Spawn the long-running mount process without waiting for it.
pub(super) fn spawn_mount(mut cmd: Command) -> VolumeResult<Child> {
    tracing::debug!(args = ?cmd.get_args().collect::<Vec<_>>(), "rclone mount");

    cmd.spawn().map_err(|e| {
        VolumeError::Process(format!("rclone mount command start failed: {}", e))
    })
}
