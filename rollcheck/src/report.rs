//! Report emitter: writes the scenario report as pretty JSON.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rollcheck_common::ScenarioReport;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create report file: {0}")]
    Create(#[source] std::io::Error),
}

/// Write `report` to `path`, or to a kept temporary file when none is given.
pub fn write_report(report: &ScenarioReport, path: Option<&Path>) -> Result<PathBuf, ReportError> {
    let json = serde_json::to_string_pretty(report)?;

    let path = match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| ReportError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            fs::write(path, &json).map_err(|source| ReportError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            path.to_path_buf()
        }
        None => {
            let mut file = tempfile::Builder::new()
                .prefix("rollcheck_")
                .suffix("_rollback_recovery_report.json")
                .tempfile()
                .map_err(ReportError::Create)?;
            file.write_all(json.as_bytes())
                .map_err(|source| ReportError::Write {
                    path: file.path().to_path_buf(),
                    source,
                })?;
            let (_, path) = file.keep().map_err(|e| ReportError::Create(e.error))?;
            path
        }
    };

    info!(path = %path.display(), "Report written");
    Ok(path)
}
