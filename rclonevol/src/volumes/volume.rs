//! Volume entity and mountpoint derivation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rclonevol_shared::constants::plugin;
use rclonevol_shared::errors::{VolumeError, VolumeResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::controller::MountProcess;

/// One logical volume.
///
/// Backend, options and mountpoint are fixed at creation and persisted.
/// `connections` and `process` describe the live mount and are never
/// persisted: every volume reloads as unmounted.
///
/// Invariant: `connections == 0` exactly when `process` is `None`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Volume {
    /// rclone remote type (e.g. "s3", "sftp", "local").
    pub backend: String,

    /// Remote options; an empty value is passed as a bare flag.
    #[serde(default)]
    pub options: BTreeMap<String, String>,

    pub mountpoint: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub(crate) connections: u32,

    #[serde(skip)]
    pub(crate) process: Option<MountProcess>,
}

impl Volume {
    /// Build an unmounted volume whose mountpoint lives under `volumes_dir`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `backend` is empty.
    pub fn new(
        volumes_dir: &Path,
        backend: impl Into<String>,
        options: BTreeMap<String, String>,
    ) -> VolumeResult<Self> {
        let backend = backend.into();
        if backend.is_empty() {
            return Err(VolumeError::InvalidArgument(format!(
                "'{}' option required",
                plugin::BACKEND_OPTION
            )));
        }

        let mountpoint = derive_mountpoint(volumes_dir, &backend, &options);

        Ok(Self {
            backend,
            options,
            mountpoint,
            created_at: Some(Utc::now()),
            connections: 0,
            process: None,
        })
    }

    pub fn connections(&self) -> u32 {
        self.connections
    }

    pub fn is_mounted(&self) -> bool {
        self.connections > 0
    }

    /// PID of the mount process, if mounted.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(|p| p.pid())
    }

    /// Snapshot for read-only callers.
    pub fn to_summary(&self, name: &str) -> VolumeSummary {
        VolumeSummary {
            name: name.to_string(),
            mountpoint: self.mountpoint.clone(),
            created_at: self.created_at,
            connections: self.connections,
            pid: self.pid(),
        }
    }
}

/// Read-only view of a volume returned by `get` and `list`.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSummary {
    pub name: String,
    pub mountpoint: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
    pub connections: u32,
    pub pid: Option<u32>,
}

/// Where a volume can be used from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeScope {
    /// Only on the host running the plugin.
    Local,
}

impl VolumeScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeScope::Local => plugin::SCOPE_LOCAL,
        }
    }
}

impl std::fmt::Display for VolumeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Split Docker driver options into the backend type and the remote options.
///
/// Returns an empty backend when the `backend` key is absent; `Volume::new`
/// rejects that.
pub fn split_driver_opts<I>(opts: I) -> (String, BTreeMap<String, String>)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut backend = String::new();
    let mut options = BTreeMap::new();

    for (key, value) in opts {
        if key == plugin::BACKEND_OPTION {
            backend = value;
        } else {
            options.insert(key, value);
        }
    }

    (backend, options)
}

/// Canonical token list: the backend plus `key` or `key=value` per option,
/// sorted lexicographically.
pub fn canonical_tokens(backend: &str, options: &BTreeMap<String, String>) -> Vec<String> {
    let mut tokens = Vec::with_capacity(options.len() + 1);
    tokens.push(backend.to_string());

    for (key, value) in options {
        if value.is_empty() {
            tokens.push(key.clone());
        } else {
            tokens.push(format!("{}={}", key, value));
        }
    }

    tokens.sort();
    tokens
}

/// Mountpoint for a configuration: `<volumes_dir>/<hex(sha256(tokens))>`.
///
/// Identical configurations resolve to the same path regardless of option order.
pub fn derive_mountpoint(
    volumes_dir: &Path,
    backend: &str,
    options: &BTreeMap<String, String>,
) -> PathBuf {
    let canonical = canonical_tokens(backend, options).join(" ");
    let digest = Sha256::digest(canonical.as_bytes());
    volumes_dir.join(hex::encode(digest))
}
