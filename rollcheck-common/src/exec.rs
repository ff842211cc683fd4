//! Bounded command execution.
//!
//! A [`CommandRunner`] never fails with an error: spawn failures, non-zero
//! exits and timeouts are all encoded in the returned [`CommandOutcome`].

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::types::{CommandLine, CommandOutcome, SENTINEL_EXIT_CODE};
use crate::util::mask_sensitive_command;

/// How long to wait for output pipes to drain once the process is gone.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs external commands on behalf of the scenario.
pub trait CommandRunner {
    fn run(
        &self,
        command: &CommandLine,
        working_dir: Option<&Path>,
        timeout: Duration,
    ) -> CommandOutcome;
}

/// Runs commands as real OS processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn_reader<R>(source: Option<R>) -> mpsc::Receiver<String>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        if let Some(mut source) = source {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = source.read_to_end(&mut buf);
                let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
            });
        }
        rx
    }

    /// Collect a reader's output without blocking on pipes held open by grandchildren.
    fn drain(rx: &mpsc::Receiver<String>) -> String {
        rx.recv_timeout(PIPE_DRAIN_TIMEOUT).unwrap_or_default()
    }

    fn wait_bounded(&self, child: &mut Child, timeout: Duration, started: Instant) -> WaitResult {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return WaitResult::Exited(status.code()),
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return WaitResult::Lost(e.to_string());
                }
            }

            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return WaitResult::TimedOut;
            }

            thread::sleep(self.poll_interval);
        }
    }
}

enum WaitResult {
    Exited(Option<i32>),
    TimedOut,
    Lost(String),
}

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        command: &CommandLine,
        working_dir: Option<&Path>,
        timeout: Duration,
    ) -> CommandOutcome {
        let shown = mask_sensitive_command(&command.to_string());
        debug!(command = %shown, timeout_secs = timeout.as_secs(), "Executing command");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let started = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %shown, error = %e, "Failed to start command");
                return CommandOutcome::spawn_failed(shown, &e);
            }
        };

        let stdout_rx = Self::spawn_reader(child.stdout.take());
        let stderr_rx = Self::spawn_reader(child.stderr.take());

        let wait = self.wait_bounded(&mut child, timeout, started);
        let duration = started.elapsed();
        let stdout = Self::drain(&stdout_rx);
        let stderr = Self::drain(&stderr_rx);

        let outcome = match wait {
            WaitResult::Exited(code) => CommandOutcome {
                // Killed by a signal: no exit code.
                exit_code: code.unwrap_or(SENTINEL_EXIT_CODE),
                stdout,
                stderr,
                command: shown,
                timed_out: false,
                duration_ms: duration.as_millis() as u64,
            },
            WaitResult::TimedOut => {
                warn!(command = %shown, timeout_secs = timeout.as_secs(), "Command timed out");
                CommandOutcome::timed_out(shown, timeout, stdout, &stderr, duration)
            }
            WaitResult::Lost(error) => CommandOutcome {
                exit_code: SENTINEL_EXIT_CODE,
                stdout,
                stderr: format!("Lost track of command: {error}"),
                command: shown,
                timed_out: false,
                duration_ms: duration.as_millis() as u64,
            },
        };

        debug!(
            command = %outcome.command,
            exit_code = outcome.exit_code,
            duration_ms = outcome.duration_ms,
            "Command finished"
        );
        outcome
    }
}
