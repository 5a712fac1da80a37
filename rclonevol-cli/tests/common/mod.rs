#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use assert_cmd::Command;
use tempfile::TempDir;

pub const BIN: &str = env!("CARGO_BIN_EXE_rclonevol");

pub struct TestContext {
    pub root: TempDir,
}

impl TestContext {
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Command bound to this context's plugin root.
    pub fn new_cmd(&self) -> Command {
        let mut cmd = Command::new(BIN);
        cmd.timeout(Duration::from_secs(30));
        cmd.env_remove("RCLONEVOL_ROOT");
        cmd.arg("--root").arg(self.root());
        cmd
    }

    pub fn state_file(&self) -> PathBuf {
        self.root().join("state").join("rclone-state.json")
    }

    /// Write a state file the way a running plugin would have.
    pub fn write_state(&self, json: &str) {
        let path = self.state_file();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, json).unwrap();
    }
}

pub fn rclonevol() -> TestContext {
    TestContext {
        root: TempDir::new().expect("Failed to create temp dir"),
    }
}

pub const SAMPLE_STATE: &str = r#"{
  "docs": {
    "Backend": "s3",
    "Options": {"bucket": "docs", "anonymous": ""},
    "Mountpoint": "/mnt/volumes/4b1c",
    "CreatedAt": "2024-05-01T10:00:00Z"
  },
  "legacy": {
    "Backend": "sftp",
    "Options": {"host": "files.example.com"},
    "Mountpoint": "/mnt/volumes/9e0f"
  }
}"#;
