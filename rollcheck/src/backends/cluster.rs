use std::path::Path;
use std::time::Duration;

use rollcheck_common::config::ClusterSettings;
use rollcheck_common::{BackendKind, Capability, CommandLine, CommandOutcome, CommandRunner};
use tracing::{debug, info};

use super::{CAPABILITY_TIMEOUT, DeploymentBackend, RollbackOutcome, numbered_rows};

/// Cluster orchestrator driven through `kubectl`-style rollout commands.
#[derive(Debug, Clone)]
pub struct ClusterBackend {
    program: String,
    deployment: String,
    namespace: String,
}

impl ClusterBackend {
    pub fn from_settings(settings: &ClusterSettings) -> Self {
        Self {
            program: settings.program.clone(),
            deployment: settings.deployment.clone(),
            namespace: settings.namespace.clone(),
        }
    }

    fn resource(&self) -> String {
        format!("deployment/{}", self.deployment)
    }

    fn cmd<I, S>(&self, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::new(&self.program).args(args)
    }

    fn namespaced<I, S>(&self, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd(args).args(["-n", self.namespace.as_str()])
    }
}

impl DeploymentBackend for ClusterBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ClusterOrchestrator
    }

    fn capability_probe(&self, runner: &dyn CommandRunner) -> Capability {
        let client = runner.run(&self.cmd(["version", "--client"]), None, CAPABILITY_TIMEOUT);
        if !client.success() {
            return Capability::Unavailable(format!(
                "{} not available ({})",
                self.program,
                client.failure_summary()
            ));
        }
        let cluster = runner.run(&self.cmd(["cluster-info"]), None, CAPABILITY_TIMEOUT);
        if !cluster.success() {
            return Capability::Unavailable(format!(
                "cluster not reachable ({})",
                cluster.failure_summary()
            ));
        }
        Capability::Available
    }

    fn deploy(
        &self,
        runner: &dyn CommandRunner,
        descriptor: &Path,
        timeout: Duration,
    ) -> CommandOutcome {
        let manifest = descriptor.display().to_string();
        let delete = runner.run(
            &self.namespaced(["delete", "-f", manifest.as_str(), "--ignore-not-found"]),
            None,
            timeout,
        );
        if !delete.success() {
            debug!(exit_code = delete.exit_code, "Pre-deploy delete failed, continuing");
        }
        runner.run(
            &self.namespaced(["apply", "-f", manifest.as_str()]),
            None,
            timeout,
        )
    }

    /// History, then undo, then a rollout-status wait bounded by `timeout`.
    ///
    /// Skipped when the history cannot be read or lists fewer than two
    /// revisions: a single revision has no earlier one to undo to.
    fn rollback(&self, runner: &dyn CommandRunner, timeout: Duration) -> RollbackOutcome {
        let resource = self.resource();
        let history = runner.run(
            &self.namespaced(["rollout", "history", resource.as_str()]),
            None,
            timeout,
        );
        if !history.success() {
            return RollbackOutcome::Skipped(format!(
                "rollout history unavailable for {resource} ({})",
                history.failure_summary()
            ));
        }
        let revisions = numbered_rows(&history.stdout);
        if revisions.len() < 2 {
            return RollbackOutcome::Skipped(format!(
                "{resource} has no previous revision to roll back to"
            ));
        }

        let undo = runner.run(
            &self.namespaced(["rollout", "undo", resource.as_str()]),
            None,
            timeout,
        );
        if !undo.success() {
            return RollbackOutcome::Executed(undo);
        }

        let wait = format!("--timeout={}s", timeout.as_secs());
        let status = runner.run(
            &self.namespaced(["rollout", "status", resource.as_str(), wait.as_str()]),
            None,
            timeout,
        );
        info!(
            deployment = %self.deployment,
            namespace = %self.namespace,
            exit_code = status.exit_code,
            "Cluster rollback finished"
        );
        RollbackOutcome::Executed(status)
    }

    fn tear_down(&self, runner: &dyn CommandRunner, timeout: Duration) -> CommandOutcome {
        let resource = self.resource();
        runner.run(
            &self.namespaced(["scale", resource.as_str(), "--replicas=0"]),
            None,
            timeout,
        )
    }
}
