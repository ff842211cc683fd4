//! rollcheck CLI: run the rollback recovery scenario once and report.
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use is_terminal::IsTerminal;
use rollcheck::summary::render_summary;
use rollcheck::verify::battery;
use rollcheck::{Backends, ScenarioEnv, Target, run_scenario, write_report};
use rollcheck_common::config::{EnvParser, apply_env_overrides, validate_settings};
use rollcheck_common::{LogConfig, LogFormat, ProcessRunner, ScenarioSettings, SettingsError, init_logging};
use tracing::{debug, error};

/// Exit code for configuration and report-writing errors.
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "rollcheck",
    version,
    about = "Break a deployment on purpose, roll it back and verify the service recovers"
)]
struct Cli {
    /// Base URL of the system under test
    #[arg(long)]
    url: Option<String>,

    /// Path of the JSON report (default: a kept temporary file)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Settings file (default: ./rollcheck.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compose descriptor to break and restore
    #[arg(long)]
    compose_file: Option<PathBuf>,

    /// Also run the negative-path recovery checks
    #[arg(long)]
    extended_checks: bool,

    /// Do not attempt the cluster rollback stage
    #[arg(long)]
    skip_cluster: bool,

    /// Do not attempt the GitOps rollback stage
    #[arg(long)]
    skip_gitops: bool,

    /// Log output format on stderr (pretty or json)
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,

    /// Also write JSON logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn resolve_settings(cli: &Cli) -> Result<ScenarioSettings, SettingsError> {
    let mut settings = ScenarioSettings::load(cli.config.as_deref())?;
    apply_env_overrides(&mut settings, EnvParser::from_process_env())?;

    if let Some(url) = &cli.url {
        settings.target.url = url.clone();
    }
    if let Some(file) = &cli.compose_file {
        settings.compose.descriptor = file.clone();
    }
    if cli.extended_checks {
        settings.extended_checks = true;
    }
    if cli.skip_cluster {
        settings.cluster.enabled = false;
    }
    if cli.skip_gitops {
        settings.gitops.enabled = false;
    }

    validate_settings(&settings)?;
    Ok(settings)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut log_config = LogConfig::from_env("info")
        .with_format(cli.log_format)
        .with_file(cli.log_file.clone())
        .with_ansi(!cli.no_color && std::io::stderr().is_terminal());
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logging_guards = init_logging(&log_config)?;

    colored::control::set_override(!cli.no_color && std::io::stdout().is_terminal());

    let settings = match resolve_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            eprintln!("rollcheck: {e}");
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };
    debug!(?settings, "Resolved settings");

    let runner = ProcessRunner::new();
    let target = Target::from_settings(&settings.target);
    let backends = Backends::from_settings(&settings);
    let checks = battery(settings.extended_checks);

    let report = run_scenario(&ScenarioEnv {
        runner: &runner,
        target: &target,
        backends: &backends,
        settings: &settings,
        checks: &checks,
    });

    let path = match write_report(&report, cli.report.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            print!("{}", render_summary(&report, None));
            error!(error = %e, "Could not write report");
            eprintln!("rollcheck: {e}");
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };
    print!("{}", render_summary(&report, Some(&path)));

    Ok(if report.overall_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).context("rollcheck failed") {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}
