//! Scenario orchestrator.
//!
//! Runs the stages in a fixed order against one set of backends:
//!
//! ```text
//! initial_health -> [cold_start] -> simulate_failure -> broken_deployment
//!   -> restore_config -> rollback -> service_recovery
//!   -> [cluster_rollback] -> [gitops_rollback] -> cleanup
//! ```
//!
//! A descriptor I/O error aborts the remaining stages; cleanup always runs.
//! Runs against the same descriptor must not overlap: there is no lock.

mod stages;

use rollcheck_common::{Capability, CommandRunner, ScenarioReport, ScenarioSettings, Stage, StageResult};
use tracing::{info, warn};

use crate::backends::{Backends, DeploymentBackend};
use crate::descriptor::{ConfigBackup, ConfigError};
use crate::target::Target;
use crate::verify::EndpointCheck;

/// Everything a stage reads; nothing here changes during a run.
pub struct ScenarioEnv<'a> {
    pub runner: &'a dyn CommandRunner,
    pub target: &'a Target,
    pub backends: &'a Backends,
    pub settings: &'a ScenarioSettings,
    pub checks: &'a [EndpointCheck],
}

/// State threaded through the stages.
#[derive(Debug)]
pub struct ScenarioContext {
    pub report: ScenarioReport,
    pub backup: ConfigBackup,
}

impl ScenarioContext {
    pub fn new(backup: ConfigBackup) -> Self {
        Self {
            report: ScenarioReport::new(),
            backup,
        }
    }

    fn record(&mut self, result: StageResult) {
        if result.skipped {
            info!(stage = %result.stage, reason = %result.message, "Stage skipped");
        } else if result.success {
            info!(stage = %result.stage, message = %result.message, "Stage passed");
        } else {
            warn!(stage = %result.stage, error = %result.message, "Stage failed");
        }
        self.report.record(result);
    }

    /// Record a descriptor failure and stop the scenario after `stage`.
    fn abort(&mut self, stage: Stage, error: ConfigError) -> Stage {
        self.record(StageResult::failed(stage, error.to_string()));
        self.report.abort_after(stage);
        stage
    }
}

/// Stages up to and including the optional rollbacks. `Err` names the
/// stage that aborted the run.
fn run_stages(env: &ScenarioEnv<'_>, ctx: &mut ScenarioContext) -> Result<(), Stage> {
    let (initial, status) = stages::initial_health(env);
    ctx.record(initial);
    if !status.is_healthy() {
        ctx.record(stages::cold_start(env));
    }

    match stages::inject_failure(&mut ctx.backup) {
        Ok(result) => ctx.record(result),
        Err(e) => return Err(ctx.abort(Stage::InjectFailure, e)),
    }

    ctx.record(stages::broken_deploy(env));

    match stages::restore_config(&mut ctx.backup) {
        Ok(result) => ctx.record(result),
        Err(e) => return Err(ctx.abort(Stage::RestoreConfig, e)),
    }

    ctx.record(stages::rollback(env));
    ctx.record(stages::verify_recovery(env));

    for slot in &env.backends.optional {
        if let Some(result) = stages::optional_rollback(env, slot) {
            ctx.record(result);
        }
    }
    Ok(())
}

/// Run the whole scenario and return its report.
pub fn run_scenario(env: &ScenarioEnv<'_>) -> ScenarioReport {
    let compose = &env.backends.compose;
    info!(
        url = env.target.base_url(),
        descriptor = %compose.descriptor().display(),
        "Starting rollback recovery scenario"
    );
    if let Capability::Unavailable(reason) = compose.capability_probe(env.runner) {
        warn!(reason = %reason, "Compose backend unavailable; deployment stages will fail");
    }

    let mut ctx = ScenarioContext::new(ConfigBackup::for_descriptor(compose.descriptor()));
    if let Err(stage) = run_stages(env, &mut ctx) {
        warn!(stage = %stage, "Scenario aborted, running cleanup");
    }
    let cleanup = stages::cleanup(env, &mut ctx.backup);
    ctx.record(cleanup);

    let report = ctx.report;
    info!(
        overall_success = report.overall_success(),
        stages = report.stages().len(),
        "Scenario finished"
    );
    report
}
