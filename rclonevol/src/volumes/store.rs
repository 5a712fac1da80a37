//! Durable snapshot of the volume registry.
//!
//! The snapshot maps volume name → persisted volume fields and is rewritten
//! in full after every mutation. Serialized as JSON so an operator can read
//! it, and so snapshots written by older plugin builds keep loading.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use rclonevol_shared::errors::{VolumeError, VolumeResult};

use super::volume::Volume;

/// Name → volume mapping as held by the registry.
pub type VolumeMap = BTreeMap<String, Volume>;

/// JSON state file at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot.
    ///
    /// A missing file yields an empty map. A file that cannot be read or
    /// parsed (including non-UTF-8 bytes) is deleted and also yields an
    /// empty map: starting clean beats starting with half the volumes, and
    /// a bad snapshot must never keep the plugin from starting.
    pub fn load(&self) -> VolumeMap {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(state_path = %self.path.display(), "No state found");
                return VolumeMap::new();
            }
            Err(e) => {
                tracing::warn!(
                    state_path = %self.path.display(),
                    error = %e,
                    "Failed to read state, removing file"
                );
                self.discard();
                return VolumeMap::new();
            }
        };

        match serde_json::from_slice::<VolumeMap>(&contents) {
            Ok(volumes) => {
                tracing::debug!(
                    state_path = %self.path.display(),
                    "Loaded state with {} volumes",
                    volumes.len()
                );
                volumes
            }
            Err(e) => {
                tracing::warn!(
                    state_path = %self.path.display(),
                    error = %e,
                    "Failed to parse state, removing file"
                );
                self.discard();
                VolumeMap::new()
            }
        }
    }

    fn discard(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(
                state_path = %self.path.display(),
                error = %e,
                "Failed to remove corrupt state file"
            );
        }
    }

    /// Read the snapshot without repairing it.
    ///
    /// For offline inspection while a daemon may own the file: a corrupt
    /// file is reported instead of deleted.
    pub fn read(&self) -> VolumeResult<VolumeMap> {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(VolumeMap::new()),
            Err(e) => {
                return Err(VolumeError::Storage(format!(
                    "failed to read state file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_slice(&contents).map_err(|e| {
            VolumeError::Storage(format!(
                "failed to parse state file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Persist the snapshot, logging instead of failing.
    ///
    /// Volume lifecycle results never depend on persistence.
    pub fn save(&self, volumes: &VolumeMap) {
        if let Err(e) = self.try_save(volumes) {
            tracing::warn!(
                state_path = %self.path.display(),
                error = %e,
                "Error saving state"
            );
        }
    }

    /// Write the snapshot through a temp file in the same directory, then
    /// rename it over the old one so readers never see a partial file.
    pub fn try_save(&self, volumes: &VolumeMap) -> VolumeResult<()> {
        let json = serde_json::to_vec_pretty(volumes)
            .map_err(|e| VolumeError::Storage(format!("failed to serialize state: {e}")))?;

        let dir = self
            .path
            .parent()
            .ok_or_else(|| VolumeError::Storage("state path has no parent".into()))?;
        std::fs::create_dir_all(dir)
            .map_err(|e| VolumeError::Storage(format!("failed to create state dir: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| VolumeError::Storage(format!("failed to create temp state: {e}")))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| VolumeError::Storage(format!("failed to write state: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| VolumeError::Storage(format!("failed to replace state: {}", e.error)))?;

        tracing::trace!("Saved state with {} volumes", volumes.len());
        Ok(())
    }
}
