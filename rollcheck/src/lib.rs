//! Deployment failure-injection and rollback recovery validation.
//!
//! Breaks a deployment descriptor on purpose, checks the broken deployment is
//! rejected, restores and rolls back, then verifies the target recovers.

#![forbid(unsafe_code)]

pub mod backends;
pub mod descriptor;
pub mod health;
pub mod report;
pub mod scenario;
pub mod summary;
pub mod target;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

pub use backends::{Backends, DeploymentBackend, RollbackOutcome};
pub use descriptor::{ConfigBackup, ConfigError};
pub use report::{ReportError, write_report};
pub use scenario::{ScenarioEnv, run_scenario};
pub use target::{ProbeError, Target};
