//! Test fixtures for rclonevol.
//!
//! - [`RecordingController`]: a `MountController` that spawns `sleep`
//!   instead of rclone and records every start/stop
//! - [`TestRegistry`]: a registry rooted in a temp directory
//! - [`fake_rclone`]: a shell script that answers like the rclone CLI

use std::collections::BTreeMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rclonevol::volumes::StateStore;
use rclonevol::{MountController, MountProcess, Volume, VolumeError, VolumeRegistry, VolumeResult};
use tempfile::TempDir;

/// Something the controller was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountEvent {
    Started { mountpoint: PathBuf, pid: u32 },
    Stopped { pid: u32 },
}

/// Fake mount provider.
///
/// Each start spawns `sleep 300` so the registry manages a real child
/// process. `start_delay` widens race windows in concurrency tests.
#[derive(Default)]
pub struct RecordingController {
    events: Mutex<Vec<MountEvent>>,
    start_delay: Option<Duration>,
    fail_start: Mutex<bool>,
    fail_stop: Mutex<bool>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_delay(delay: Duration) -> Self {
        Self {
            start_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make subsequent starts fail (or succeed again).
    pub fn set_fail_start(&self, fail: bool) {
        *self.fail_start.lock() = fail;
    }

    /// Make subsequent stops report failure. The process is still reaped
    /// so tests do not leak children.
    pub fn set_fail_stop(&self, fail: bool) {
        *self.fail_stop.lock() = fail;
    }

    pub fn events(&self) -> Vec<MountEvent> {
        self.events.lock().clone()
    }

    pub fn starts(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, MountEvent::Started { .. }))
            .count()
    }

    pub fn stops(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, MountEvent::Stopped { .. }))
            .count()
    }
}

impl MountController for RecordingController {
    fn start(&self, volume: &Volume) -> VolumeResult<MountProcess> {
        if *self.fail_start.lock() {
            return Err(VolumeError::Process(
                "rclone mount command start failed: injected".into(),
            ));
        }

        if let Some(delay) = self.start_delay {
            std::thread::sleep(delay);
        }

        let child = Command::new("sleep")
            .arg("300")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VolumeError::Process(format!("failed to spawn sleep: {e}")))?;

        self.events.lock().push(MountEvent::Started {
            mountpoint: volume.mountpoint.clone(),
            pid: child.id(),
        });

        MountProcess::new(child)
    }

    fn stop(&self, process: MountProcess) -> VolumeResult<()> {
        let pid = process.pid();
        let result = process.terminate();
        if *self.fail_stop.lock() {
            return Err(VolumeError::Process(format!(
                "failed to wait for mount process {pid}: injected"
            )));
        }
        result?;
        self.events.lock().push(MountEvent::Stopped { pid });
        Ok(())
    }
}

/// Registry rooted in a temp directory, backed by a [`RecordingController`].
pub struct TestRegistry {
    pub registry: VolumeRegistry,
    pub controller: Arc<RecordingController>,
    pub temp_dir: TempDir,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::with_controller(RecordingController::new())
    }

    pub fn with_controller(controller: RecordingController) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let controller = Arc::new(controller);
        let registry = open_registry(temp_dir.path(), controller.clone());

        Self {
            registry,
            controller,
            temp_dir,
        }
    }

    pub fn volumes_dir(&self) -> PathBuf {
        self.temp_dir.path().join("volumes")
    }

    pub fn state_file(&self) -> PathBuf {
        state_file(self.temp_dir.path())
    }

    /// Open a second registry over the same directory, as after a restart.
    pub fn reopen(&self) -> VolumeRegistry {
        open_registry(self.temp_dir.path(), Arc::new(RecordingController::new()))
    }

    /// Create a volume from `(key, value)` pairs.
    pub fn create(&self, name: &str, backend: &str, options: &[(&str, &str)]) -> VolumeResult<()> {
        self.registry.create(name, backend, options_from(options))
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn options_from(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn state_file(root: &Path) -> PathBuf {
    root.join("state").join("rclone-state.json")
}

fn open_registry(root: &Path, controller: Arc<RecordingController>) -> VolumeRegistry {
    VolumeRegistry::open(
        root.join("volumes"),
        StateStore::new(state_file(root)),
        controller,
    )
    .expect("Failed to open registry")
}

/// Write an executable stand-in for rclone into `dir`.
///
/// `config create` exits with `config_exit_code` (printing a message on
/// failure); `mount` replaces itself with `sleep 300`. Every invocation is
/// appended to `<dir>/invocations.log`.
pub fn fake_rclone(dir: &Path, config_exit_code: i32) -> PathBuf {
    let path = dir.join("rclone");
    let log = dir.join("invocations.log");
    let script = format!(
        r#"#!/bin/sh
[ "$1" = "probe" ] && exit 0
echo "$@" >> "{log}"
case "$1" in
  config)
    if [ {code} -ne 0 ]; then
      echo "Failed to create remote: unknown backend" >&2
    fi
    exit {code}
    ;;
  mount)
    exec sleep 300
    ;;
esac
exit 1
"#,
        log = log.display(),
        code = config_exit_code,
    );

    std::fs::write(&path, script).expect("Failed to write fake rclone");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to make fake rclone executable");
    wait_executable(&path);
    path
}

/// Exec can fail with ETXTBSY while a process forked by another test thread
/// still holds the write descriptor; retry until the script runs.
fn wait_executable(path: &Path) {
    for _ in 0..50 {
        match Command::new(path).arg("probe").status() {
            Ok(_) => return,
            Err(e) if e.raw_os_error() == Some(libc::ETXTBSY) => {
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(e) => panic!("fake rclone not executable: {e}"),
        }
    }
    panic!("fake rclone stayed busy");
}

/// Lines logged by [`fake_rclone`], one per invocation.
pub fn fake_rclone_invocations(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("invocations.log"))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
