//! Test support: a [`CommandRunner`] that replays canned outcomes.
//!
//! Rules match on a substring of the rendered command line; when several
//! rules match, the longest pattern wins. Each rule holds a queue of
//! outcomes and the last one repeats once the queue is drained.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::exec::CommandRunner;
use crate::types::{CommandLine, CommandOutcome, SENTINEL_EXIT_CODE, TIMEOUT_MARKER};

/// Exit code returned for commands no rule matches.
pub const UNSCRIPTED_EXIT_CODE: i32 = 127;

/// Canned result for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ScriptedOutcome {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            timed_out: false,
        }
    }

    pub fn fail(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    pub fn timeout() -> Self {
        Self {
            exit_code: SENTINEL_EXIT_CODE,
            stdout: String::new(),
            stderr: TIMEOUT_MARKER.to_string(),
            timed_out: true,
        }
    }

    fn into_outcome(self, command: String) -> CommandOutcome {
        CommandOutcome {
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
            command,
            timed_out: self.timed_out,
            duration_ms: 0,
        }
    }
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: String,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    outcomes: Vec<ScriptedOutcome>,
}

#[derive(Debug, Default)]
struct State {
    rules: Vec<Rule>,
    calls: Vec<RecordedCall>,
}

/// Replays scripted outcomes and records every call it receives.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    state: Mutex<State>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `outcome` (always).
    pub fn on(self, pattern: impl Into<String>, outcome: ScriptedOutcome) -> Self {
        self.on_sequence(pattern, vec![outcome])
    }

    /// Answer successive matching commands from `outcomes`; the last repeats.
    pub fn on_sequence(self, pattern: impl Into<String>, outcomes: Vec<ScriptedOutcome>) -> Self {
        let pattern = pattern.into();
        {
            let mut state = self.lock();
            state.rules.retain(|rule| rule.pattern != pattern);
            if !outcomes.is_empty() {
                state.rules.push(Rule { pattern, outcomes });
            }
        }
        self
    }

    /// Every command line received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.iter().map(|c| c.command.clone()).collect()
    }

    /// Full records of every call received so far.
    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of calls whose command line contains `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.command.contains(pattern))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        command: &CommandLine,
        working_dir: Option<&Path>,
        timeout: Duration,
    ) -> CommandOutcome {
        let rendered = command.to_string();
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            command: rendered.clone(),
            working_dir: working_dir.map(Path::to_path_buf),
            timeout,
        });

        let rule = state
            .rules
            .iter_mut()
            .filter(|rule| rendered.contains(&rule.pattern))
            .max_by_key(|rule| rule.pattern.len());

        let scripted = match rule {
            Some(rule) if rule.outcomes.len() > 1 => rule.outcomes.remove(0),
            Some(rule) => rule.outcomes[0].clone(),
            None => ScriptedOutcome::fail(
                UNSCRIPTED_EXIT_CODE,
                format!("command not scripted: {rendered}"),
            ),
        };
        scripted.into_outcome(rendered)
    }
}
