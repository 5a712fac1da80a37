use std::path::{Path, PathBuf};

use rclonevol_shared::constants::layout as dirs;

// ============================================================================
// FILESYSTEM LAYOUT (plugin root)
// ============================================================================

/// Directory structure under the plugin root.
///
/// ```text
/// <root>/
/// ├── .lock                      single-instance lock
/// ├── volumes/<sha256>/          one mountpoint per distinct configuration
/// └── state/rclone-state.json    persisted registry snapshot
/// ```
#[derive(Clone, Debug)]
pub struct FilesystemLayout {
    root_dir: PathBuf,
}

impl FilesystemLayout {
    pub fn new(root_dir: PathBuf) -> Self {
        Self { root_dir }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Parent of every mountpoint: <root>/volumes
    pub fn volumes_dir(&self) -> PathBuf {
        self.root_dir.join(dirs::VOLUMES_DIR)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root_dir.join(dirs::STATE_DIR)
    }

    /// Registry snapshot: <root>/state/rclone-state.json
    pub fn state_file(&self) -> PathBuf {
        self.state_dir().join(dirs::STATE_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root_dir.join(dirs::LOCK_FILE)
    }

    /// Create the directories the plugin writes into.
    ///
    /// Mountpoints themselves are created lazily on first mount.
    pub fn prepare(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root_dir)?;
        std::fs::create_dir_all(self.volumes_dir())?;
        std::fs::create_dir_all(self.state_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = FilesystemLayout::new(PathBuf::from("/mnt"));

        assert_eq!(layout.volumes_dir(), PathBuf::from("/mnt/volumes"));
        assert_eq!(layout.state_dir(), PathBuf::from("/mnt/state"));
        assert_eq!(
            layout.state_file(),
            PathBuf::from("/mnt/state/rclone-state.json")
        );
        assert_eq!(layout.lock_file(), PathBuf::from("/mnt/.lock"));
    }

    #[test]
    fn test_prepare_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let layout = FilesystemLayout::new(temp_dir.path().join("plugin"));

        layout.prepare().unwrap();

        assert!(layout.volumes_dir().is_dir());
        assert!(layout.state_dir().is_dir());
        // Idempotent
        layout.prepare().unwrap();
    }
}
