//! Human-readable, stage-by-stage summary printed after a run.

use std::fmt::Write;
use std::path::Path;

use colored::Colorize;
use rollcheck_common::{ScenarioReport, StageResult};

fn marker(result: &StageResult) -> colored::ColoredString {
    if result.skipped {
        "SKIP".yellow()
    } else if result.success {
        "PASS".green()
    } else {
        "FAIL".red().bold()
    }
}

/// Render the summary. Colour follows the global `colored` override.
pub fn render_summary(report: &ScenarioReport, report_path: Option<&Path>) -> String {
    let width = report
        .stages()
        .iter()
        .map(|r| r.name().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({})",
        "Rollback recovery scenario".bold(),
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for result in report.stages() {
        let flag = if result.stage.is_mandatory() { "*" } else { " " };
        let _ = writeln!(
            out,
            "  {} {}{:<width$}  {}",
            marker(result),
            flag,
            result.name(),
            result.message,
        );
    }

    if let Some(stage) = report.aborted() {
        let _ = writeln!(out, "{} after {}", "Aborted".red().bold(), stage);
    }
    let mandatory: Vec<_> = report
        .stages()
        .iter()
        .filter(|r| r.stage.is_mandatory())
        .collect();
    let passed = mandatory.iter().filter(|r| r.success).count();
    let verdict = if report.overall_success() {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    let _ = writeln!(
        out,
        "Result: {verdict} ({passed}/{} mandatory stages passed)",
        mandatory.len()
    );
    if let Some(path) = report_path {
        let _ = writeln!(out, "Report: {}", path.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcheck_common::Stage;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_summary_lists_stages_in_order() {
        plain();
        let mut report = ScenarioReport::new();
        report.record(StageResult::passed(Stage::InitialHealthCheck, "healthy"));
        report.record(StageResult::passed(Stage::InjectFailure, "injected"));
        report.record(StageResult::failed(Stage::BrokenDeploy, "unexpected success"));
        report.record(StageResult::skipped(Stage::ClusterRollback, "kubectl not available"));

        let text = render_summary(&report, Some(Path::new("/tmp/report.json")));
        let initial = text.find("initial_health").unwrap();
        let broken = text.find("FAIL *broken_deployment").unwrap();
        let cluster = text.find("SKIP  cluster_rollback").unwrap();
        assert!(initial < broken && broken < cluster);
        assert!(text.contains("Result: FAILED (1/2 mandatory stages passed)"));
        assert!(text.contains("Report: /tmp/report.json"));
    }

    #[test]
    fn test_summary_mentions_abort() {
        plain();
        let mut report = ScenarioReport::new();
        report.record(StageResult::failed(Stage::InjectFailure, "descriptor not found"));
        report.abort_after(Stage::InjectFailure);
        let text = render_summary(&report, None);
        assert!(text.contains("Aborted after simulate_failure"));
        assert!(!text.contains("Report:"));
    }
}
