//! Individual scenario stages.
//!
//! Each stage reads the environment, touches the descriptor backup when it
//! has to, and returns exactly one [`StageResult`]. Recording is left to
//! the orchestrator.

use std::thread;

use rollcheck_common::{Capability, HealthStatus, Stage, StageResult};
use tracing::{info, warn};

use super::ScenarioEnv;
use crate::backends::{DeploymentBackend, OptionalBackend, RollbackOutcome};
use crate::descriptor::{ConfigBackup, ConfigError, InjectMode, RestoreOutcome, inject};
use crate::health::{self, ProbeSummary};
use crate::verify;

fn probe(env: &ScenarioEnv<'_>) -> ProbeSummary {
    let health = &env.settings.health;
    health::probe(env.target, health.max_attempts, health.delay())
}

fn attempts(n: u32) -> String {
    if n == 1 {
        "1 attempt".to_string()
    } else {
        format!("{n} attempts")
    }
}

pub(crate) fn initial_health(env: &ScenarioEnv<'_>) -> (StageResult, HealthStatus) {
    let summary = probe(env);
    let stage = Stage::InitialHealthCheck;
    let result = if summary.status.is_healthy() {
        StageResult::passed(stage, format!("target healthy after {}", attempts(summary.attempts)))
    } else {
        StageResult::failed(
            stage,
            format!("target {} after {}", summary.status, attempts(summary.attempts)),
        )
    };
    (result, summary.status)
}

/// Deploy from the pristine descriptor, wait, and probe again.
pub(crate) fn cold_start(env: &ScenarioEnv<'_>) -> StageResult {
    let stage = Stage::ColdStart;
    let compose = &env.backends.compose;
    let outcome = compose.deploy(
        env.runner,
        compose.descriptor(),
        env.settings.timing.command_timeout(),
    );
    if !outcome.success() {
        return StageResult::failed(
            stage,
            format!("cold start deploy failed: {}", outcome.failure_summary()),
        );
    }

    let wait = env.settings.timing.cold_start_wait();
    info!(wait_secs = wait.as_secs(), "Waiting for cold start");
    thread::sleep(wait);

    let summary = probe(env);
    if summary.status.is_healthy() {
        StageResult::passed(stage, "target healthy after cold start")
    } else {
        StageResult::failed(stage, format!("target still {} after cold start", summary.status))
    }
}

pub(crate) fn inject_failure(backup: &mut ConfigBackup) -> Result<StageResult, ConfigError> {
    backup.backup()?;
    let message = match inject(backup)? {
        InjectMode::Rewritten { services } => {
            format!("broken descriptor written ({services} service(s) rewritten)")
        }
        InjectMode::Template => "broken descriptor written from template".to_string(),
    };
    Ok(StageResult::passed(Stage::InjectFailure, message))
}

/// Passes when the deploy command fails; a successful deploy is the failure.
pub(crate) fn broken_deploy(env: &ScenarioEnv<'_>) -> StageResult {
    let stage = Stage::BrokenDeploy;
    let compose = &env.backends.compose;
    let outcome = compose.deploy(
        env.runner,
        compose.descriptor(),
        env.settings.timing.command_timeout(),
    );
    if outcome.success() {
        warn!("Broken deployment came up");
        StageResult::failed(
            stage,
            "unexpected success: the broken deployment came up",
        )
    } else {
        StageResult::passed(
            stage,
            format!("broken deployment rejected as expected ({})", outcome.failure_summary()),
        )
    }
}

pub(crate) fn restore_config(backup: &mut ConfigBackup) -> Result<StageResult, ConfigError> {
    let message = match backup.restore()? {
        RestoreOutcome::Restored => "descriptor restored from backup",
        RestoreOutcome::NothingHeld => "no backup held, nothing to restore",
    };
    Ok(StageResult::passed(Stage::RestoreConfig, message))
}

/// Map a rollback outcome onto a stage result.
///
/// A skip is only acceptable for optional stages.
fn rollback_result(stage: Stage, outcome: RollbackOutcome) -> StageResult {
    match outcome {
        RollbackOutcome::Executed(outcome) if outcome.success() => {
            StageResult::passed(stage, "rollback completed")
        }
        RollbackOutcome::Executed(outcome) => StageResult::failed(
            stage,
            format!("rollback failed: {}", outcome.failure_summary()),
        ),
        RollbackOutcome::Skipped(reason) if stage.is_mandatory() => {
            StageResult::failed(stage, format!("rollback skipped: {reason}"))
        }
        RollbackOutcome::Skipped(reason) => StageResult::skipped(stage, reason),
        RollbackOutcome::Simulated(message) => StageResult::passed(stage, message),
    }
}

pub(crate) fn rollback(env: &ScenarioEnv<'_>) -> StageResult {
    let outcome = env
        .backends
        .compose
        .rollback(env.runner, env.settings.timing.command_timeout());
    rollback_result(Stage::Rollback, outcome)
}

/// Settle, confirm health, then run the endpoint battery once.
pub(crate) fn verify_recovery(env: &ScenarioEnv<'_>) -> StageResult {
    let stage = Stage::VerifyRecovery;
    let settle = env.settings.timing.recovery_settle();
    info!(settle_secs = settle.as_secs(), "Letting services settle");
    thread::sleep(settle);

    let summary = probe(env);
    if !summary.status.is_healthy() {
        return StageResult::failed(
            stage,
            format!(
                "target not healthy after rollback ({} after {})",
                summary.status,
                attempts(summary.attempts)
            ),
        );
    }

    let failures = verify::verify(env.target, env.checks);
    if failures.is_empty() {
        StageResult::passed(stage, format!("all {} checks passed", env.checks.len()))
    } else {
        let details = failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        StageResult::failed(
            stage,
            format!("{} of {} checks failed: {details}", failures.len(), env.checks.len()),
        )
    }
}

/// Rollback on a cluster or GitOps backend; never fails for missing tooling.
pub(crate) fn optional_rollback(env: &ScenarioEnv<'_>, slot: &OptionalBackend) -> Option<StageResult> {
    let kind = slot.kind();
    let stage = Stage::for_optional_backend(kind)?;
    let backend = match slot {
        OptionalBackend::Disabled(_) => {
            return Some(StageResult::skipped(stage, format!("{kind} disabled by configuration")));
        }
        OptionalBackend::Enabled(backend) => backend,
    };
    if let Capability::Unavailable(reason) = backend.capability_probe(env.runner) {
        info!(backend = %kind, reason = %reason, "Backend unavailable, skipping");
        return Some(StageResult::skipped(stage, reason));
    }
    let outcome = backend.rollback(env.runner, env.settings.timing.command_timeout());
    Some(rollback_result(stage, outcome))
}

/// Best-effort teardown; also repairs the descriptor after an aborted run.
pub(crate) fn cleanup(env: &ScenarioEnv<'_>, backup: &mut ConfigBackup) -> StageResult {
    let timeout = env.settings.timing.command_timeout();
    let compose = &env.backends.compose;
    let mut problems = Vec::new();
    let mut done = Vec::new();

    let down = compose.tear_down(env.runner, timeout);
    if down.success() {
        done.push("services stopped".to_string());
    } else {
        problems.push(format!("teardown failed: {}", down.failure_summary()));
    }

    if let Some(prune) = compose.prune_images(env.runner, timeout) {
        if prune.success() {
            done.push("images pruned".to_string());
        } else {
            problems.push(format!("image prune failed: {}", prune.failure_summary()));
        }
    }

    match backup.restore() {
        Ok(RestoreOutcome::Restored) => {
            warn!("Descriptor was still broken, restored during cleanup");
            done.push("descriptor restored".to_string());
        }
        Ok(RestoreOutcome::NothingHeld) => {}
        Err(e) => problems.push(e.to_string()),
    }
    match backup.discard_leftover() {
        Ok(true) => done.push("leftover backup removed".to_string()),
        Ok(false) => {}
        Err(e) => problems.push(e.to_string()),
    }

    if problems.is_empty() {
        StageResult::passed(Stage::Cleanup, done.join(", "))
    } else {
        StageResult::failed(Stage::Cleanup, problems.join("; "))
    }
}
