//! Shared building blocks for rollcheck.
//!
//! Holds the scenario data model, the bounded command executor, layered
//! configuration, logging setup and the scripted runner used by tests.

#![forbid(unsafe_code)]

pub mod config;
pub mod exec;
pub mod logging;
pub mod testing;
pub mod types;
pub mod util;

pub use config::{ScenarioSettings, SettingsError};
pub use exec::{CommandRunner, ProcessRunner};
pub use logging::{LogConfig, LogFormat, LoggingGuards, init_logging};
pub use types::{
    BackendKind, Capability, CommandLine, CommandOutcome, HealthStatus, SENTINEL_EXIT_CODE,
    ScenarioReport, Stage, StageResult,
};
pub use util::mask_sensitive_command;
