//! Volume registry and persistence.
//!
//! # Overview
//!
//! - **Volume**: one named volume (backend, options, mountpoint, live mount)
//! - **VolumeRegistry**: thread-safe name → volume map enforcing the
//!   reference-counted mount lifecycle
//! - **StateStore**: JSON snapshot rewritten after every mutation
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! use rclonevol::controller::RcloneController;
//! use rclonevol::volumes::{StateStore, VolumeRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = VolumeRegistry::open(
//!     "/mnt/volumes".into(),
//!     StateStore::new("/mnt/state/rclone-state.json".into()),
//!     Arc::new(RcloneController::new("/rclone".into(), "mnt")),
//! )?;
//!
//! let mut options = BTreeMap::new();
//! options.insert("host".to_string(), "files.example.com".to_string());
//! registry.create("shared", "sftp", options)?;
//!
//! let mountpoint = registry.mount("shared")?;
//! println!("mounted at {}", mountpoint.display());
//! registry.unmount("shared")?;
//! # Ok(())
//! # }
//! ```

mod registry;
mod store;
mod volume;

pub use registry::VolumeRegistry;
pub use store::{StateStore, VolumeMap};
pub use volume::{
    Volume, VolumeScope, VolumeSummary, canonical_tokens, derive_mountpoint, split_driver_opts,
};
