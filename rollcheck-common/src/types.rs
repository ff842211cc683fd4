//! Common types used across rollcheck components.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::util::tail_lines;

/// Exit code recorded when a command could not be spawned or was killed.
pub const SENTINEL_EXIT_CODE: i32 = -1;

/// Marker placed at the start of stderr for commands killed on timeout.
pub const TIMEOUT_MARKER: &str = "Command timed out";

/// A program invocation assembled from a static template.
///
/// Commands are never passed through a shell; every argument reaches the
/// program verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of one command execution. Produced once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Command line as executed, with secrets masked.
    pub command: String,
    pub timed_out: bool,
    #[serde(default)]
    pub duration_ms: u64,
}

impl CommandOutcome {
    /// Outcome for a process that could not be started.
    pub fn spawn_failed(command: impl Into<String>, error: &std::io::Error) -> Self {
        Self {
            exit_code: SENTINEL_EXIT_CODE,
            stdout: String::new(),
            stderr: format!("Failed to start command: {}", error),
            command: command.into(),
            timed_out: false,
            duration_ms: 0,
        }
    }

    /// Outcome for a process that was killed after exceeding its timeout.
    pub fn timed_out(
        command: impl Into<String>,
        timeout: Duration,
        stdout: String,
        partial_stderr: &str,
        duration: Duration,
    ) -> Self {
        let mut stderr = format!("{} after {}s", TIMEOUT_MARKER, timeout.as_secs());
        if !partial_stderr.trim().is_empty() {
            stderr.push('\n');
            stderr.push_str(partial_stderr);
        }
        Self {
            exit_code: SENTINEL_EXIT_CODE,
            stdout,
            stderr,
            command: command.into(),
            timed_out: true,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Exit code zero and not killed.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Short human-readable reason for a failed command.
    pub fn failure_summary(&self) -> String {
        if self.timed_out {
            return format!("{} ({})", TIMEOUT_MARKER, self.command);
        }
        let last = tail_lines(&self.stderr, 1);
        if last.trim().is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {}: {}", self.exit_code, last.trim())
        }
    }
}

/// Health of the target system as seen by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// `/health` answered 200 with `status == "healthy"`.
    Healthy,
    /// The target never accepted a connection.
    Unreachable,
    /// The target answered, but not with a healthy report.
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Healthy => "healthy",
            Self::Unreachable => "unreachable",
            Self::Unhealthy => "unhealthy",
        };
        write!(f, "{label}")
    }
}

/// Deployment backends the scenario can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    LocalCompose,
    ClusterOrchestrator,
    GitOpsTool,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LocalCompose => "local-compose",
            Self::ClusterOrchestrator => "cluster-orchestrator",
            Self::GitOpsTool => "gitops-tool",
        };
        write!(f, "{label}")
    }
}

/// Result of a backend capability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Available,
    Unavailable(String),
}

impl Capability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Scenario stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InitialHealthCheck,
    ColdStart,
    InjectFailure,
    BrokenDeploy,
    RestoreConfig,
    Rollback,
    VerifyRecovery,
    ClusterRollback,
    GitOpsRollback,
    Cleanup,
}

impl Stage {
    /// Key used in the JSON report.
    pub fn name(self) -> &'static str {
        match self {
            Self::InitialHealthCheck => "initial_health",
            Self::ColdStart => "cold_start",
            Self::InjectFailure => "simulate_failure",
            Self::BrokenDeploy => "broken_deployment",
            Self::RestoreConfig => "restore_config",
            Self::Rollback => "rollback",
            Self::VerifyRecovery => "service_recovery",
            Self::ClusterRollback => "cluster_rollback",
            Self::GitOpsRollback => "gitops_rollback",
            Self::Cleanup => "cleanup",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::InitialHealthCheck => "Initial health check",
            Self::ColdStart => "Cold start",
            Self::InjectFailure => "Inject deployment failure",
            Self::BrokenDeploy => "Attempt broken deployment",
            Self::RestoreConfig => "Restore configuration",
            Self::Rollback => "Rollback deployment",
            Self::VerifyRecovery => "Verify service recovery",
            Self::ClusterRollback => "Cluster rollback",
            Self::GitOpsRollback => "GitOps rollback",
            Self::Cleanup => "Cleanup",
        }
    }

    /// Mandatory stages decide the overall result; the rest are informational.
    pub fn is_mandatory(self) -> bool {
        matches!(
            self,
            Self::InjectFailure
                | Self::BrokenDeploy
                | Self::RestoreConfig
                | Self::Rollback
                | Self::VerifyRecovery
        )
    }

    /// Optional rollback stage driven by the given backend, if any.
    pub fn for_optional_backend(kind: BackendKind) -> Option<Self> {
        match kind {
            BackendKind::LocalCompose => None,
            BackendKind::ClusterOrchestrator => Some(Self::ClusterRollback),
            BackendKind::GitOpsTool => Some(Self::GitOpsRollback),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one stage. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: Stage,
    pub success: bool,
    pub message: String,
    /// The stage did not run because its backend is unavailable or disabled.
    pub skipped: bool,
}

impl StageResult {
    pub fn passed(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            success: true,
            message: message.into(),
            skipped: false,
        }
    }

    pub fn failed(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            success: false,
            message: message.into(),
            skipped: false,
        }
    }

    /// A skipped stage counts as a success.
    pub fn skipped(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            success: true,
            message: reason.into(),
            skipped: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.stage.name()
    }
}

/// Ordered record of every stage of one scenario run.
///
/// Serializes to `{timestamp, tests: {<stage>: {...}}, overall_success}`
/// with `tests` in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub timestamp: DateTime<Utc>,
    stages: Vec<StageResult>,
    aborted: Option<Stage>,
}

impl Default for ScenarioReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioReport {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            stages: Vec::new(),
            aborted: None,
        }
    }

    /// Append a stage result.
    pub fn record(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    /// Mark the scenario as aborted after the given stage.
    pub fn abort_after(&mut self, stage: Stage) {
        self.aborted.get_or_insert(stage);
    }

    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    pub fn get(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn aborted(&self) -> Option<Stage> {
        self.aborted
    }

    pub fn mandatory_count(&self) -> usize {
        self.stages.iter().filter(|r| r.stage.is_mandatory()).count()
    }

    /// Logical AND over the recorded mandatory stages; an aborted run never passes.
    pub fn overall_success(&self) -> bool {
        self.aborted.is_none()
            && self
                .stages
                .iter()
                .filter(|r| r.stage.is_mandatory())
                .all(|r| r.success)
    }
}

#[derive(Serialize)]
struct StageEntry<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    skipped: bool,
}

impl<'a> From<&'a StageResult> for StageEntry<'a> {
    fn from(result: &'a StageResult) -> Self {
        let text = result.message.as_str();
        Self {
            success: result.success,
            message: result.success.then_some(text),
            error: (!result.success).then_some(text),
            skipped: result.skipped,
        }
    }
}

struct StageTable<'a>(&'a [StageResult]);

impl Serialize for StageTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in self.0 {
            map.serialize_entry(result.name(), &StageEntry::from(result))?;
        }
        map.end()
    }
}

impl Serialize for ScenarioReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(
            "timestamp",
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        map.serialize_entry("tests", &StageTable(&self.stages))?;
        map.serialize_entry("overall_success", &self.overall_success())?;
        if let Some(stage) = self.aborted {
            map.serialize_entry("aborted", stage.name())?;
        }
        map.end()
    }
}
