//! rclonevol - Docker volume plugin backed by rclone mounts
//!
//! Volumes are named rclone remote configurations. The first mount of a
//! volume starts an `rclone mount` process on a mountpoint derived from the
//! configuration; the last unmount stops it. The registry is persisted so
//! volumes survive plugin restarts (as unmounted).

pub mod controller;
pub mod runtime;
pub mod server;
pub mod util;
pub mod volumes;

pub use controller::{MountController, MountProcess, RcloneController};
pub use rclonevol_shared::errors::{VolumeError, VolumeResult};
pub use runtime::PluginRuntime;
pub use runtime::options::PluginOptions;
pub use volumes::{Volume, VolumeRegistry, VolumeSummary};
