//! Forwarding of mount process stdout/stderr into `tracing`.
//!
//! rclone prefixes its lines with its own level (`2024/05/01 10:00:00 ERROR : ...`).
//! That level is kept when re-logging; lines without one fall back to a
//! per-stream default.

use std::io::{BufRead, BufReader, Read};
use std::process::{ChildStderr, ChildStdout};
use std::thread::{self, JoinHandle};

use rclonevol_shared::errors::{VolumeError, VolumeResult};
use tracing::Level;

/// Owns one reader thread per output stream.
///
/// Threads exit on EOF, i.e. once every holder of the pipe's write end is
/// gone. That can outlive the mount process itself (a forked helper keeps
/// the pipe), so the threads are never joined: dropping the handler
/// detaches them.
pub(super) struct LogStreamHandler {
    _readers: Vec<JoinHandle<()>>,
}

impl LogStreamHandler {
    pub(super) fn new(stdout: ChildStdout, stderr: ChildStderr) -> VolumeResult<Self> {
        let readers = vec![
            forward("stdout", stdout, Level::DEBUG)?,
            forward("stderr", stderr, Level::WARN)?,
        ];
        Ok(Self { _readers: readers })
    }
}

fn forward<R: Read + Send + 'static>(
    stream: &'static str,
    pipe: R,
    fallback: Level,
) -> VolumeResult<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("rclone-{stream}"))
        .spawn(move || {
            for line in BufReader::new(pipe).lines() {
                let line = match line {
                    Ok(line) => strip_ansi(&line),
                    Err(e) => {
                        tracing::error!(target: "rclone", stream, error = %e, "Pipe read failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                emit(line_level(&line).unwrap_or(fallback), stream, &line);
            }
            tracing::trace!(target: "rclone", stream, "Pipe closed");
        })
        .map_err(|e| VolumeError::Process(format!("failed to spawn {stream} log reader: {e}")))
}

fn emit(level: Level, stream: &str, line: &str) {
    if level == Level::ERROR {
        tracing::error!(target: "rclone", stream, "{line}");
    } else if level == Level::WARN {
        tracing::warn!(target: "rclone", stream, "{line}");
    } else if level == Level::INFO {
        tracing::info!(target: "rclone", stream, "{line}");
    } else {
        tracing::debug!(target: "rclone", stream, "{line}");
    }
}

/// Level rclone printed for this line, if any.
fn line_level(line: &str) -> Option<Level> {
    // <date> <time> <LEVEL>: with the level padded, e.g. "INFO  :" or "NOTICE:"
    let word = line.split_whitespace().nth(2)?.trim_end_matches(':');
    match word {
        "CRITICAL" | "ERROR" => Some(Level::ERROR),
        "NOTICE" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        _ => None,
    }
}

/// Drop `ESC [ ... <letter>` sequences; rclone colors its output on a tty.
fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_escape = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            in_escape = true;
        } else {
            out.push(c);
        }
    }

    out
}
