use std::path::Path;
use std::time::Duration;

use rollcheck_common::config::GitOpsSettings;
use rollcheck_common::{BackendKind, Capability, CommandLine, CommandOutcome, CommandRunner};
use tracing::{debug, info};

use super::{CAPABILITY_TIMEOUT, DeploymentBackend, RollbackOutcome, numbered_rows};

/// GitOps delivery tool driven through the `argocd` CLI.
///
/// Rollback is simulated: history is read to pick the target revision, but
/// no mutating call is issued because write credentials are not assumed.
#[derive(Debug, Clone)]
pub struct GitOpsBackend {
    program: String,
    app: String,
}

impl GitOpsBackend {
    pub fn from_settings(settings: &GitOpsSettings) -> Self {
        Self {
            program: settings.program.clone(),
            app: settings.app.clone(),
        }
    }

    fn app_cmd(&self, sub: &str) -> CommandLine {
        CommandLine::new(&self.program).args(["app", sub, self.app.as_str()])
    }
}

impl DeploymentBackend for GitOpsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::GitOpsTool
    }

    fn capability_probe(&self, runner: &dyn CommandRunner) -> Capability {
        let cmd = CommandLine::new(&self.program).args(["version", "--client"]);
        let outcome = runner.run(&cmd, None, CAPABILITY_TIMEOUT);
        if outcome.success() {
            Capability::Available
        } else {
            Capability::Unavailable(format!(
                "{} not available ({})",
                self.program,
                outcome.failure_summary()
            ))
        }
    }

    /// Sync the application; the descriptor lives in the Git repository, not here.
    fn deploy(
        &self,
        runner: &dyn CommandRunner,
        _descriptor: &Path,
        timeout: Duration,
    ) -> CommandOutcome {
        let stop = runner.run(&self.app_cmd("terminate-op"), None, timeout);
        if !stop.success() {
            debug!(exit_code = stop.exit_code, "No running operation to terminate");
        }
        runner.run(&self.app_cmd("sync"), None, timeout)
    }

    fn rollback(&self, runner: &dyn CommandRunner, timeout: Duration) -> RollbackOutcome {
        let history = runner.run(&self.app_cmd("history"), None, timeout);
        if !history.success() {
            return RollbackOutcome::Skipped(format!(
                "application history unavailable for {} ({})",
                self.app,
                history.failure_summary()
            ));
        }
        let ids = numbered_rows(&history.stdout);
        let target = match ids.as_slice() {
            [] => {
                return RollbackOutcome::Skipped(format!(
                    "{} has no deployment history",
                    self.app
                ));
            }
            [only] => *only,
            [.., previous, _current] => *previous,
        };
        info!(app = %self.app, history_id = target, "GitOps rollback simulated");
        RollbackOutcome::Simulated(format!(
            "rollback of {} to history id {target} simulated; no mutating call issued",
            self.app
        ))
    }

    fn tear_down(&self, runner: &dyn CommandRunner, timeout: Duration) -> CommandOutcome {
        runner.run(&self.app_cmd("terminate-op"), None, timeout)
    }
}
