//! Deployment backends driven through their command-line tools.
//!
//! Each backend owns its command vocabulary. Commands are assembled from
//! static templates plus validated names, and never pass through a shell.

mod cluster;
mod compose;
mod gitops;

pub use cluster::ClusterBackend;
pub use compose::ComposeBackend;
pub use gitops::GitOpsBackend;

use std::path::Path;
use std::time::Duration;

use rollcheck_common::{BackendKind, Capability, CommandOutcome, CommandRunner, ScenarioSettings};

/// Upper bound for capability probes; they only query versions and reachability.
pub const CAPABILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// What a rollback request turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// A real rollback ran; success follows the final command.
    Executed(CommandOutcome),
    /// Nothing to roll back, or the prerequisites are missing.
    Skipped(String),
    /// Preconditions were checked but no mutating call was issued.
    Simulated(String),
}

pub trait DeploymentBackend {
    fn kind(&self) -> BackendKind;

    /// Cheap, non-mutating check that the control tool and its target are usable.
    fn capability_probe(&self, runner: &dyn CommandRunner) -> Capability;

    /// Tear down whatever runs (outcome ignored), then deploy from `descriptor`.
    fn deploy(
        &self,
        runner: &dyn CommandRunner,
        descriptor: &Path,
        timeout: Duration,
    ) -> CommandOutcome;

    fn rollback(&self, runner: &dyn CommandRunner, timeout: Duration) -> RollbackOutcome;

    /// Best-effort stop.
    fn tear_down(&self, runner: &dyn CommandRunner, timeout: Duration) -> CommandOutcome;
}

/// An optional backend, or the kind that configuration switched off.
pub enum OptionalBackend {
    Enabled(Box<dyn DeploymentBackend>),
    Disabled(BackendKind),
}

impl OptionalBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Enabled(backend) => backend.kind(),
            Self::Disabled(kind) => *kind,
        }
    }
}

/// The backends of one scenario: compose always, the others when enabled.
pub struct Backends {
    pub compose: ComposeBackend,
    pub optional: Vec<OptionalBackend>,
}

impl Backends {
    pub fn from_settings(settings: &ScenarioSettings) -> Self {
        let cluster = if settings.cluster.enabled {
            OptionalBackend::Enabled(Box::new(ClusterBackend::from_settings(&settings.cluster)))
        } else {
            OptionalBackend::Disabled(BackendKind::ClusterOrchestrator)
        };
        let gitops = if settings.gitops.enabled {
            OptionalBackend::Enabled(Box::new(GitOpsBackend::from_settings(&settings.gitops)))
        } else {
            OptionalBackend::Disabled(BackendKind::GitOpsTool)
        };
        Self {
            compose: ComposeBackend::from_settings(&settings.compose),
            optional: vec![cluster, gitops],
        }
    }
}

/// Rows of a tool's history table whose first column is a number.
pub(crate) fn numbered_rows(output: &str) -> Vec<u64> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|first| first.parse().ok())
        .collect()
}
