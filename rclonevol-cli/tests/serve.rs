use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use predicates::prelude::*;

mod common;

fn spawn_serve(root: &Path, socket: &Path) -> Child {
    Command::new(common::BIN)
        .env_remove("RCLONEVOL_ROOT")
        .arg("--root")
        .arg(root)
        .arg("serve")
        .arg("--socket")
        .arg(socket)
        .arg("--rclone")
        .arg(root.join("no-rclone"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn rclonevol serve")
}

fn wait_for_socket(socket: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if UnixStream::connect(socket).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    panic!("plugin socket never came up");
}

/// Minimal HTTP/1.1 POST over the plugin socket; returns the raw response.
fn post(socket: &Path, endpoint: &str, body: &str) -> String {
    let mut stream = UnixStream::connect(socket).unwrap();
    write!(
        stream,
        "POST {endpoint} HTTP/1.1\r\nHost: plugin\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

fn terminate(child: &mut Child) -> std::process::ExitStatus {
    Command::new("kill")
        .arg("-TERM")
        .arg(child.id().to_string())
        .status()
        .unwrap();
    child.wait().unwrap()
}

#[test]
fn test_serve_answers_and_persists() {
    let ctx = common::rclonevol();
    let socket = ctx.root().join("plugin.sock");
    let mut child = spawn_serve(ctx.root(), &socket);
    wait_for_socket(&socket);

    let response = post(&socket, "/Plugin.Activate", "");
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#"{"Implements":["VolumeDriver"]}"#));

    let response = post(
        &socket,
        "/VolumeDriver.Create",
        r#"{"Name":"docs","Opts":{"backend":"s3","bucket":"docs"}}"#,
    );
    assert!(response.starts_with("HTTP/1.1 200"));

    let response = post(&socket, "/VolumeDriver.Create", r#"{"Name":"bad","Opts":{}}"#);
    assert!(response.starts_with("HTTP/1.1 500"));
    assert!(response.contains("'backend' option required"));

    let status = terminate(&mut child);
    assert!(status.success());
    assert!(!socket.exists());

    ctx.new_cmd()
        .args(["ls", "-q"])
        .assert()
        .success()
        .stdout("docs\n");
}

#[test]
fn test_second_instance_is_refused() {
    let ctx = common::rclonevol();
    let socket = ctx.root().join("plugin.sock");
    let mut child = spawn_serve(ctx.root(), &socket);
    wait_for_socket(&socket);

    ctx.new_cmd()
        .args(["serve", "--socket"])
        .arg(ctx.root().join("other.sock"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("already using directory"));

    terminate(&mut child);
}

#[test]
fn test_stale_socket_is_replaced() {
    let ctx = common::rclonevol();
    let socket = ctx.root().join("plugin.sock");
    std::fs::write(&socket, b"stale").unwrap();

    let mut child = spawn_serve(ctx.root(), &socket);
    wait_for_socket(&socket);

    let response = post(&socket, "/VolumeDriver.List", "{}");
    assert!(response.contains(r#"{"Volumes":[]}"#));

    terminate(&mut child);
}
