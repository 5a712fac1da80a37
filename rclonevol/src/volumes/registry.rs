//! Thread-safe volume registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rclonevol_shared::errors::{VolumeError, VolumeResult};

use super::store::{StateStore, VolumeMap};
use super::volume::{Volume, VolumeScope, VolumeSummary};
use crate::controller::MountController;

/// Single source of truth for all volumes.
///
/// Cloneable via `Arc`; every clone shares the same map.
///
/// # Locking
///
/// One `RwLock` guards the whole map. Create, Remove, Mount, Unmount and Get
/// take the write guard and keep it across directory changes, process
/// start/stop and persistence, so no two mutations ever interleave and the
/// state file always reflects a consistent snapshot. Path and List take the
/// read guard. Mounts of different volumes are therefore serialized too.
#[derive(Clone)]
pub struct VolumeRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    volumes: RwLock<VolumeMap>,
    volumes_dir: PathBuf,
    store: StateStore,
    controller: Arc<dyn MountController>,
}

impl VolumeRegistry {
    /// Open the registry, restoring persisted volumes as unmounted.
    ///
    /// A corrupt or unreadable state file is discarded and the registry
    /// starts empty.
    pub fn open(
        volumes_dir: PathBuf,
        store: StateStore,
        controller: Arc<dyn MountController>,
    ) -> VolumeResult<Self> {
        let volumes = store.load();

        tracing::info!(
            volumes = volumes.len(),
            state_path = %store.path().display(),
            "Volume registry opened"
        );

        Ok(Self {
            inner: Arc::new(RegistryInner {
                volumes: RwLock::new(volumes),
                volumes_dir,
                store,
                controller,
            }),
        })
    }

    /// Register a volume.
    ///
    /// An existing volume with the same name is replaced. If the replaced
    /// volume was still mounted, its process is stopped so it is not left
    /// running without an owner.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `backend` is empty; the registry is left
    /// untouched.
    pub fn create(
        &self,
        name: &str,
        backend: &str,
        options: BTreeMap<String, String>,
    ) -> VolumeResult<()> {
        let mut volumes = self.write()?;

        let volume = Volume::new(&self.inner.volumes_dir, backend, options)?;

        tracing::debug!(
            volume = %name,
            backend = %volume.backend,
            mountpoint = %volume.mountpoint.display(),
            "Creating volume"
        );

        if let Some(mut replaced) = volumes.insert(name.to_string(), volume) {
            tracing::warn!(
                volume = %name,
                connections = replaced.connections,
                "Replacing existing volume"
            );
            if let Some(process) = replaced.process.take()
                && let Err(e) = self.inner.controller.stop(process)
            {
                tracing::warn!(volume = %name, error = %e, "Failed to stop replaced mount");
            }
        }

        self.inner.store.save(&volumes);
        Ok(())
    }

    /// Delete a volume and its mount directory.
    ///
    /// The directory is kept when another volume shares the same
    /// configuration (and therefore the same mountpoint).
    ///
    /// # Errors
    ///
    /// - `NotFound` if no volume has this name
    /// - `InUse` if the volume is still mounted
    /// - `Storage` if the directory cannot be removed
    pub fn remove(&self, name: &str) -> VolumeResult<()> {
        let mut volumes = self.write()?;

        let volume = volumes
            .get(name)
            .ok_or_else(|| VolumeError::NotFound(name.to_string()))?;

        if volume.connections != 0 {
            return Err(VolumeError::InUse(name.to_string()));
        }

        let shared = volumes
            .iter()
            .any(|(other, v)| other != name && v.mountpoint == volume.mountpoint);

        if shared {
            tracing::debug!(
                volume = %name,
                mountpoint = %volume.mountpoint.display(),
                "Mountpoint shared with another volume, keeping directory"
            );
        } else {
            remove_mount_dir(&volume.mountpoint)?;
        }

        volumes.remove(name);
        tracing::debug!(volume = %name, "Removed volume");

        self.inner.store.save(&volumes);
        Ok(())
    }

    /// Mountpoint of a volume.
    pub fn path(&self, name: &str) -> VolumeResult<PathBuf> {
        let volumes = self.read()?;

        volumes
            .get(name)
            .map(|v| v.mountpoint.clone())
            .ok_or_else(|| VolumeError::NotFound(name.to_string()))
    }

    /// Take a reference on a volume, starting its mount on the first one.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no volume has this name
    /// - `Storage` if the mountpoint cannot be created or is not a directory
    /// - `Process` if the mount provider fails to start
    ///
    /// On error the connection count is unchanged.
    pub fn mount(&self, name: &str) -> VolumeResult<PathBuf> {
        tracing::debug!(volume = %name, "Request to mount");

        let mut volumes = self.write()?;

        let volume = volumes
            .get_mut(name)
            .ok_or_else(|| VolumeError::NotFound(name.to_string()))?;

        tracing::debug!(
            volume = %name,
            connections = volume.connections,
            "Mount"
        );

        if volume.connections == 0 {
            ensure_mount_dir(&volume.mountpoint)?;

            let process = self.inner.controller.start(volume)?;
            tracing::info!(volume = %name, pid = process.pid(), "Mount successful");
            volume.process = Some(process);
        }

        volume.connections += 1;

        Ok(volume.mountpoint.clone())
    }

    /// Release a reference on a volume, stopping its mount on the last one.
    ///
    /// Unmounting an already unmounted volume is accepted and leaves the
    /// count at zero.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no volume has this name
    /// - `Process` if the mount process cannot be signalled or reaped; the
    ///   handle is released and the count is zero either way
    pub fn unmount(&self, name: &str) -> VolumeResult<()> {
        tracing::debug!(volume = %name, "Request to unmount");

        let mut volumes = self.write()?;

        let volume = volumes
            .get_mut(name)
            .ok_or_else(|| VolumeError::NotFound(name.to_string()))?;

        volume.connections = volume.connections.saturating_sub(1);

        if volume.connections == 0
            && let Some(process) = volume.process.take()
        {
            let pid = process.pid();
            self.inner.controller.stop(process)?;
            tracing::info!(volume = %name, pid, "Unmount successful");
        }

        Ok(())
    }

    /// Look up a single volume.
    ///
    /// Takes the write guard, like every other per-volume operation except
    /// `path`.
    pub fn get(&self, name: &str) -> VolumeResult<VolumeSummary> {
        let volumes = self.write()?;

        volumes
            .get(name)
            .map(|v| v.to_summary(name))
            .ok_or_else(|| VolumeError::NotFound(name.to_string()))
    }

    /// All volumes, in no particular order.
    pub fn list(&self) -> VolumeResult<Vec<VolumeSummary>> {
        let volumes = self.read()?;

        Ok(volumes
            .iter()
            .map(|(name, v)| v.to_summary(name))
            .collect())
    }

    /// Volumes are local to this host.
    pub fn capabilities(&self) -> VolumeScope {
        VolumeScope::Local
    }

    /// Number of registered volumes.
    pub fn count(&self) -> VolumeResult<usize> {
        Ok(self.read()?.len())
    }

    /// Stop every running mount process.
    ///
    /// Used on daemon shutdown. Counts are reset, volumes stay registered.
    pub fn shutdown(&self) -> VolumeResult<()> {
        let mut volumes = self.write()?;

        for (name, volume) in volumes.iter_mut() {
            volume.connections = 0;
            if let Some(process) = volume.process.take() {
                match self.inner.controller.stop(process) {
                    Ok(()) => tracing::info!(volume = %name, "Stopped mount on shutdown"),
                    Err(e) => {
                        tracing::warn!(volume = %name, error = %e, "Failed to stop mount on shutdown")
                    }
                }
            }
        }

        Ok(())
    }

    fn read(&self) -> VolumeResult<RwLockReadGuard<'_, VolumeMap>> {
        self.inner
            .volumes
            .read()
            .map_err(|e| VolumeError::Internal(format!("registry lock poisoned: {}", e)))
    }

    fn write(&self) -> VolumeResult<RwLockWriteGuard<'_, VolumeMap>> {
        self.inner
            .volumes
            .write()
            .map_err(|e| VolumeError::Internal(format!("registry lock poisoned: {}", e)))
    }
}

impl std::fmt::Debug for VolumeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeRegistry")
            .field("volumes_dir", &self.inner.volumes_dir)
            .field("state_path", &self.inner.store.path())
            .finish()
    }
}

/// Make sure `path` is a directory, creating it (and parents) if missing.
fn ensure_mount_dir(path: &Path) -> VolumeResult<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(VolumeError::Storage(format!(
            "{} already exist and it's not a directory",
            path.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            use std::os::unix::fs::DirBuilderExt;

            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(0o755)
                .create(path)
                .map_err(|e| {
                    VolumeError::Storage(format!(
                        "failed to create mountpoint {}: {}",
                        path.display(),
                        e
                    ))
                })
        }
        Err(e) => Err(VolumeError::Storage(format!(
            "failed to stat mountpoint {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Recursively delete a mount directory; a missing directory is fine.
fn remove_mount_dir(path: &Path) -> VolumeResult<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(VolumeError::Storage(format!(
            "failed to remove mountpoint {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::MountProcess;
    use std::process::{Command, Stdio};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Spawns `sleep` instead of rclone and counts calls.
    #[derive(Default)]
    struct SleepController {
        starts: Mutex<u32>,
        stops: Mutex<u32>,
        fail_start: bool,
    }

    impl MountController for SleepController {
        fn start(&self, _volume: &Volume) -> VolumeResult<MountProcess> {
            if self.fail_start {
                return Err(VolumeError::Process("rclone mount command start failed".into()));
            }
            *self.starts.lock().unwrap() += 1;
            let child = Command::new("sleep")
                .arg("300")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| VolumeError::Process(e.to_string()))?;
            MountProcess::new(child)
        }

        fn stop(&self, process: MountProcess) -> VolumeResult<()> {
            *self.stops.lock().unwrap() += 1;
            process.terminate().map(|_| ())
        }
    }

    fn create_test_registry(
        temp_dir: &TempDir,
        controller: Arc<SleepController>,
    ) -> VolumeRegistry {
        VolumeRegistry::open(
            temp_dir.path().join("volumes"),
            StateStore::new(temp_dir.path().join("state").join("rclone-state.json")),
            controller,
        )
        .unwrap()
    }

    #[test]
    fn test_create_and_path() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry(&temp_dir, Arc::default());

        registry.create("v1", "local", BTreeMap::new()).unwrap();

        let path = registry.path("v1").unwrap();
        assert!(path.starts_with(temp_dir.path().join("volumes")));
        // Directory is only created on mount
        assert!(!path.exists());
    }

    #[test]
    fn test_create_without_backend_does_not_mutate() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry(&temp_dir, Arc::default());

        let err = registry.create("v1", "", BTreeMap::new()).unwrap_err();

        assert!(matches!(err, VolumeError::InvalidArgument(_)));
        assert_eq!(registry.count().unwrap(), 0);
        assert!(!temp_dir.path().join("state").join("rclone-state.json").exists());
    }

    #[test]
    fn test_mount_unknown_volume() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry(&temp_dir, Arc::default());

        let err = registry.mount("missing").unwrap_err();
        assert!(matches!(err, VolumeError::NotFound(_)));
        assert_eq!(err.to_string(), "volume missing not found");
    }

    #[test]
    fn test_reference_counting() {
        let temp_dir = TempDir::new().unwrap();
        let controller = Arc::new(SleepController::default());
        let registry = create_test_registry(&temp_dir, controller.clone());
        registry.create("v1", "local", BTreeMap::new()).unwrap();

        let path = registry.mount("v1").unwrap();
        registry.mount("v1").unwrap();
        assert!(path.is_dir());
        assert_eq!(*controller.starts.lock().unwrap(), 1);
        assert_eq!(registry.get("v1").unwrap().connections, 2);

        registry.unmount("v1").unwrap();
        assert_eq!(*controller.stops.lock().unwrap(), 0);
        assert!(registry.get("v1").unwrap().pid.is_some());

        registry.unmount("v1").unwrap();
        assert_eq!(*controller.stops.lock().unwrap(), 1);
        let summary = registry.get("v1").unwrap();
        assert_eq!(summary.connections, 0);
        assert!(summary.pid.is_none());
    }

    #[test]
    fn test_unmount_unmounted_volume_clamps_to_zero() {
        let temp_dir = TempDir::new().unwrap();
        let controller = Arc::new(SleepController::default());
        let registry = create_test_registry(&temp_dir, controller.clone());
        registry.create("v1", "local", BTreeMap::new()).unwrap();

        registry.unmount("v1").unwrap();
        registry.unmount("v1").unwrap();

        assert_eq!(registry.get("v1").unwrap().connections, 0);
        assert_eq!(*controller.stops.lock().unwrap(), 0);

        // Next mount still starts a process
        registry.mount("v1").unwrap();
        assert_eq!(*controller.starts.lock().unwrap(), 1);
        registry.unmount("v1").unwrap();
    }

    #[test]
    fn test_failed_start_leaves_count_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let controller = Arc::new(SleepController {
            fail_start: true,
            ..Default::default()
        });
        let registry = create_test_registry(&temp_dir, controller);
        registry.create("v1", "local", BTreeMap::new()).unwrap();

        let err = registry.mount("v1").unwrap_err();

        assert!(matches!(err, VolumeError::Process(_)));
        assert_eq!(registry.get("v1").unwrap().connections, 0);
        registry.remove("v1").unwrap();
    }

    #[test]
    fn test_mountpoint_occupied_by_file() {
        let temp_dir = TempDir::new().unwrap();
        let controller = Arc::new(SleepController::default());
        let registry = create_test_registry(&temp_dir, controller.clone());
        registry.create("v1", "local", BTreeMap::new()).unwrap();

        let path = registry.path("v1").unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not a directory").unwrap();

        let err = registry.mount("v1").unwrap_err();

        assert!(matches!(err, VolumeError::Storage(_)));
        assert!(err.to_string().contains("not a directory"));
        assert_eq!(*controller.starts.lock().unwrap(), 0);
        assert_eq!(registry.get("v1").unwrap().connections, 0);
    }

    #[test]
    fn test_remove_in_use() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry(&temp_dir, Arc::default());
        registry.create("v1", "local", BTreeMap::new()).unwrap();
        registry.mount("v1").unwrap();
        registry.mount("v1").unwrap();

        let err = registry.remove("v1").unwrap_err();
        assert!(matches!(err, VolumeError::InUse(_)));
        assert_eq!(err.to_string(), "volume v1 is currently used by a container");

        registry.unmount("v1").unwrap();
        assert!(matches!(registry.remove("v1"), Err(VolumeError::InUse(_))));

        registry.unmount("v1").unwrap();
        registry.remove("v1").unwrap();
        assert!(matches!(registry.path("v1"), Err(VolumeError::NotFound(_))));
    }

    #[test]
    fn test_remove_deletes_directory_tree() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry(&temp_dir, Arc::default());
        registry.create("v1", "local", BTreeMap::new()).unwrap();

        let path = registry.mount("v1").unwrap();
        registry.unmount("v1").unwrap();
        std::fs::create_dir_all(path.join("nested")).unwrap();
        std::fs::write(path.join("nested").join("file"), b"data").unwrap();

        registry.remove("v1").unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_remove_unknown_volume() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry(&temp_dir, Arc::default());

        assert!(matches!(
            registry.remove("missing"),
            Err(VolumeError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_overwrites_existing_name() {
        let temp_dir = TempDir::new().unwrap();
        let controller = Arc::new(SleepController::default());
        let registry = create_test_registry(&temp_dir, controller.clone());

        registry.create("v1", "local", BTreeMap::new()).unwrap();
        let first = registry.path("v1").unwrap();
        registry.mount("v1").unwrap();

        let mut options = BTreeMap::new();
        options.insert("bucket".to_string(), "b".to_string());
        registry.create("v1", "s3", options).unwrap();

        let summary = registry.get("v1").unwrap();
        assert_ne!(summary.mountpoint, first);
        assert_eq!(summary.connections, 0);
        // The displaced mount was stopped rather than orphaned
        assert_eq!(*controller.stops.lock().unwrap(), 1);
        assert_eq!(registry.count().unwrap(), 1);
    }

    #[test]
    fn test_list() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry(&temp_dir, Arc::default());
        assert!(registry.list().unwrap().is_empty());

        registry.create("v1", "local", BTreeMap::new()).unwrap();
        registry.create("v2", "sftp", BTreeMap::new()).unwrap();

        let mut names: Vec<String> = registry.list().unwrap().into_iter().map(|v| v.name).collect();
        names.sort();
        assert_eq!(names, vec!["v1", "v2"]);
    }

    #[test]
    fn test_capabilities_local() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry(&temp_dir, Arc::default());
        assert_eq!(registry.capabilities(), VolumeScope::Local);
        assert_eq!(registry.capabilities().as_str(), "local");
    }

    #[test]
    fn test_shutdown_stops_all_mounts() {
        let temp_dir = TempDir::new().unwrap();
        let controller = Arc::new(SleepController::default());
        let registry = create_test_registry(&temp_dir, controller.clone());
        registry.create("v1", "local", BTreeMap::new()).unwrap();
        registry.create("v2", "sftp", BTreeMap::new()).unwrap();
        registry.mount("v1").unwrap();
        registry.mount("v2").unwrap();

        registry.shutdown().unwrap();

        assert_eq!(*controller.stops.lock().unwrap(), 2);
        assert!(registry.list().unwrap().iter().all(|v| v.connections == 0));
        assert_eq!(registry.count().unwrap(), 2);
    }
}
