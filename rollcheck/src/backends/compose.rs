use std::path::{Path, PathBuf};
use std::time::Duration;

use rollcheck_common::config::ComposeSettings;
use rollcheck_common::{BackendKind, Capability, CommandLine, CommandOutcome, CommandRunner};
use tracing::{debug, info, warn};

use super::{CAPABILITY_TIMEOUT, DeploymentBackend, RollbackOutcome};

/// Compose-style local orchestrator (`docker-compose`, `docker compose`, `podman-compose`).
#[derive(Debug, Clone)]
pub struct ComposeBackend {
    program: String,
    base_args: Vec<String>,
    descriptor: PathBuf,
    prune_images: bool,
}

impl ComposeBackend {
    pub fn from_settings(settings: &ComposeSettings) -> Self {
        Self {
            program: settings.program.clone(),
            base_args: settings.base_args.clone(),
            descriptor: settings.descriptor.clone(),
            prune_images: settings.prune_images,
        }
    }

    pub fn descriptor(&self) -> &Path {
        &self.descriptor
    }

    /// `<program> <base_args> -f <file> <sub>`, run from the descriptor's directory.
    fn command<'a>(&self, descriptor: &'a Path, sub: &[&str]) -> (CommandLine, Option<&'a Path>) {
        let file = descriptor
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| descriptor.display().to_string());
        let dir = descriptor.parent().filter(|p| !p.as_os_str().is_empty());
        let cmd = CommandLine::new(&self.program)
            .args(&self.base_args)
            .args(["-f", file.as_str()])
            .args(sub.iter().copied());
        (cmd, dir)
    }

    fn down(&self, runner: &dyn CommandRunner, descriptor: &Path, timeout: Duration) -> CommandOutcome {
        let (cmd, dir) = self.command(descriptor, &["down", "--remove-orphans"]);
        runner.run(&cmd, dir, timeout)
    }

    /// Container engine behind the compose tool: `docker-compose` -> `docker`.
    fn engine(&self) -> &str {
        self.program
            .strip_suffix("-compose")
            .filter(|engine| !engine.is_empty())
            .unwrap_or(&self.program)
    }

    /// `<engine> image prune -f` when enabled in settings.
    pub fn prune_images(&self, runner: &dyn CommandRunner, timeout: Duration) -> Option<CommandOutcome> {
        if !self.prune_images {
            return None;
        }
        let cmd = CommandLine::new(self.engine()).args(["image", "prune", "-f"]);
        Some(runner.run(&cmd, None, timeout))
    }
}

impl DeploymentBackend for ComposeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalCompose
    }

    fn capability_probe(&self, runner: &dyn CommandRunner) -> Capability {
        let cmd = CommandLine::new(&self.program)
            .args(&self.base_args)
            .arg("version");
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

    fn deploy(
        &self,
        runner: &dyn CommandRunner,
        descriptor: &Path,
        timeout: Duration,
    ) -> CommandOutcome {
        let down = self.down(runner, descriptor, timeout);
        if !down.success() {
            debug!(exit_code = down.exit_code, "Pre-deploy teardown failed, continuing");
        }
        let (cmd, dir) = self.command(descriptor, &["up", "--build", "-d"]);
        let outcome = runner.run(&cmd, dir, timeout);
        if outcome.success() {
            info!(descriptor = %descriptor.display(), "Compose deployment started");
        } else {
            warn!(
                descriptor = %descriptor.display(),
                exit_code = outcome.exit_code,
                "Compose deployment failed"
            );
        }
        outcome
    }

    /// Redeploy from the (restored) descriptor.
    fn rollback(&self, runner: &dyn CommandRunner, timeout: Duration) -> RollbackOutcome {
        RollbackOutcome::Executed(self.deploy(runner, &self.descriptor, timeout))
    }

    fn tear_down(&self, runner: &dyn CommandRunner, timeout: Duration) -> CommandOutcome {
        self.down(runner, &self.descriptor, timeout)
    }
}
