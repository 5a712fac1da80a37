//! Top-level plugin runtime.

use std::sync::Arc;

use rclonevol_shared::errors::{VolumeError, VolumeResult};

use crate::controller::{MountController, RcloneController};
use crate::runtime::layout::FilesystemLayout;
use crate::runtime::lock::RuntimeLock;
use crate::runtime::options::PluginOptions;
use crate::volumes::{StateStore, VolumeRegistry};

/// Everything a running plugin owns: the root lock, the layout and the
/// volume registry.
///
/// Only one `PluginRuntime` can use a given root directory at a time. The
/// lock is released when the last clone is dropped.
///
/// Cheaply cloneable via `Arc`; all clones share the same registry.
#[derive(Clone)]
pub struct PluginRuntime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    options: PluginOptions,
    layout: FilesystemLayout,
    registry: VolumeRegistry,
    _runtime_lock: RuntimeLock,
}

impl PluginRuntime {
    /// Create a runtime that mounts volumes with rclone.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The options are invalid
    /// - Another plugin instance holds the root directory
    /// - The directory layout cannot be created
    /// - An existing state file cannot be read
    pub fn new(options: PluginOptions) -> VolumeResult<Self> {
        let controller = RcloneController::new(options.rclone_binary.clone(), &options.profile);

        if !controller.binary().exists() {
            tracing::warn!(
                binary = %controller.binary().display(),
                "rclone binary not found, mounts will fail until it is installed"
            );
        }

        Self::with_controller(options, Arc::new(controller))
    }

    /// Create a runtime with a custom mount controller.
    pub fn with_controller(
        options: PluginOptions,
        controller: Arc<dyn MountController>,
    ) -> VolumeResult<Self> {
        options.validate()?;

        let layout = FilesystemLayout::new(options.root_dir.clone());

        layout.prepare().map_err(|e| {
            VolumeError::Storage(format!(
                "Failed to initialize filesystem at {}: {}",
                layout.root_dir().display(),
                e
            ))
        })?;

        let runtime_lock = RuntimeLock::acquire(layout.root_dir())?;

        let registry = VolumeRegistry::open(
            layout.volumes_dir(),
            StateStore::new(layout.state_file()),
            controller,
        )?;

        Ok(Self {
            inner: Arc::new(RuntimeInner {
                options,
                layout,
                registry,
                _runtime_lock: runtime_lock,
            }),
        })
    }

    pub fn registry(&self) -> &VolumeRegistry {
        &self.inner.registry
    }

    pub fn layout(&self) -> &FilesystemLayout {
        &self.inner.layout
    }

    pub fn options(&self) -> &PluginOptions {
        &self.inner.options
    }
}

impl std::fmt::Debug for PluginRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRuntime")
            .field("root_dir", &self.inner.layout.root_dir())
            .field("registry", &self.inner.registry)
            .finish()
    }
}
