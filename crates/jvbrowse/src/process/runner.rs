use std::fmt::{Display, Formatter};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use encoding_rs::SHIFT_JIS;
use log::{Level, info, log};

use crate::coordinator::OperationHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One external invocation: program, arguments, working directory, extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl ProcessSpec {
    #[must_use]
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Command line as it would be typed, for logs.
    #[must_use]
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|part| quote_argument(&part))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
}

impl ProcessOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// The child was killed because its operation was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCancelled {
    pub label: String,
}

impl Display for ProcessCancelled {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} was cancelled", self.label)
    }
}

impl std::error::Error for ProcessCancelled {}

/// Runs `spec` to completion with both pipes drained on their own threads.
///
/// Every output line is logged as it arrives. When `handle` is cancelled the
/// child is killed and [`ProcessCancelled`] is returned.
pub fn run_process(spec: &ProcessSpec, handle: &OperationHandle) -> Result<ProcessOutcome> {
    if handle.is_cancelled() {
        return Err(anyhow!(ProcessCancelled {
            label: spec.label.clone(),
        }));
    }

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &spec.working_dir {
        command.current_dir(dir);
    }
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    info!("{}: running {}", spec.label, spec.display_command());
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {}: {}", spec.label, spec.program.display()))?;

    let stdout = child
        .stdout
        .take()
        .context("child stdout was not captured")?;
    let stderr = child
        .stderr
        .take()
        .context("child stderr was not captured")?;
    let stdout_reader = drain_lines(stdout, spec.label.clone(), Level::Info);
    let stderr_reader = drain_lines(stderr, spec.label.clone(), Level::Warn);

    let status = loop {
        if handle.is_cancelled() {
            if let Err(error) = child.kill() {
                log::warn!("{}: kill failed: {error}", spec.label);
            }
            let _ = child.wait();
            join_reader(stdout_reader);
            join_reader(stderr_reader);
            return Err(anyhow!(ProcessCancelled {
                label: spec.label.clone(),
            }));
        }
        match child
            .try_wait()
            .with_context(|| format!("failed to poll {}", spec.label))?
        {
            Some(status) => break status,
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let outcome = ProcessOutcome {
        exit_code: status.code(),
        stdout_lines: join_reader(stdout_reader),
        stderr_lines: join_reader(stderr_reader),
    };
    info!(
        "{}: exited with {}",
        spec.label,
        outcome
            .exit_code
            .map_or_else(|| "signal".to_string(), |code| code.to_string())
    );
    Ok(outcome)
}

fn drain_lines<R: Read + Send + 'static>(pipe: R, label: String, level: Level) -> JoinHandle<Vec<String>> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut lines = Vec::new();
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) => break,
                Ok(_) => {
                    let line = decode_line(&buffer);
                    log!(level, "[{label}] {line}");
                    lines.push(line);
                }
                Err(error) => {
                    log::warn!("[{label}] pipe read failed: {error}");
                    break;
                }
            }
        }
        lines
    })
}

fn join_reader(reader: JoinHandle<Vec<String>>) -> Vec<String> {
    reader.join().unwrap_or_default()
}

/// UTF-8 when valid, otherwise Shift_JIS (the acquisition tool writes CP932).
#[must_use]
pub fn decode_line(bytes: &[u8]) -> String {
    let trimmed = trim_line_ending(bytes);
    match std::str::from_utf8(trimmed) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = SHIFT_JIS.decode(trimmed);
            text.into_owned()
        }
    }
}

fn trim_line_ending(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

/// Double-quotes arguments containing whitespace or quotes.
#[must_use]
pub fn quote_argument(value: &str) -> String {
    if !value.is_empty() && !value.chars().any(|ch| ch.is_whitespace() || ch == '"') {
        return value.to_string();
    }
    format!("\"{}\"", value.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_decode_as_utf8_or_shift_jis() {
        assert_eq!(decode_line("取得完了\r\n".as_bytes()), "取得完了");
        let (encoded, _, _) = SHIFT_JIS.encode("取得完了");
        assert_eq!(decode_line(&encoded), "取得完了");
    }

    #[test]
    fn arguments_with_spaces_are_quoted_for_logs() {
        let spec = ProcessSpec::new("predict", "python")
            .args(["-m", "keiba.predict", "--date", "2025-09-06"])
            .arg("C:\\Program Files\\x");
        assert_eq!(
            spec.display_command(),
            "python -m keiba.predict --date 2025-09-06 \"C:\\Program Files\\x\""
        );
        assert_eq!(quote_argument(""), "\"\"");
    }

    #[test]
    fn already_cancelled_handle_never_spawns() {
        let coordinator = crate::coordinator::OperationCoordinator::new();
        let handle = coordinator.begin();
        handle.cancel();

        let spec = ProcessSpec::new("noop", "/definitely/not/a/program");
        let error = run_process(&spec, &handle).expect_err("cancelled run should fail");
        assert!(error.downcast_ref::<ProcessCancelled>().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn captures_both_streams_and_exit_code() {
        let handle = crate::coordinator::OperationCoordinator::new().begin();
        let spec = ProcessSpec::new("sh", "sh").args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let outcome = run_process(&spec, &handle).expect("process should run");

        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.success());
        assert_eq!(outcome.stdout_lines, ["out"]);
        assert_eq!(outcome.stderr_lines, ["err"]);
    }
}
