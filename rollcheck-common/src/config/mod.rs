//! Configuration system for rollcheck.
//!
//! Settings are layered, later layers winning:
//! - built-in defaults
//! - a TOML file (`--config`, else `./rollcheck.toml` when present)
//! - `ROLLCHECK_*` environment variables
//! - command-line flags (applied by the binary)

pub mod env;
pub mod validate;

pub use env::{EnvError, EnvParser, apply_env_overrides};
pub use validate::validate_settings;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "rollcheck.toml";

/// Errors raised while assembling [`ScenarioSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid environment configuration: {}", join_env_errors(.0))]
    Env(Vec<EnvError>),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn join_env_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Everything the scenario needs to know about its environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    pub target: TargetSettings,
    pub health: HealthSettings,
    pub timing: TimingSettings,
    pub compose: ComposeSettings,
    pub cluster: ClusterSettings,
    pub gitops: GitOpsSettings,
    /// Also run the negative-path endpoint checks during recovery.
    pub extended_checks: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSettings {
    /// Base URL of the system under test.
    pub url: String,
    /// Per-request timeout of a health probe.
    pub probe_timeout_secs: u64,
    /// Per-request timeout of a recovery check.
    pub check_timeout_secs: u64,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            probe_timeout_secs: 5,
            check_timeout_secs: 10,
        }
    }
}

impl TargetSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay_ms: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay_ms: 1000,
        }
    }
}

impl HealthSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Upper bound for every deploy/rollback command.
    pub command_timeout_secs: u64,
    /// Wait after a cold start before probing again.
    pub cold_start_wait_secs: u64,
    /// Wait after the rollback before verifying recovery.
    pub recovery_settle_secs: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            command_timeout_secs: 300,
            cold_start_wait_secs: 15,
            recovery_settle_secs: 10,
        }
    }
}

impl TimingSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn cold_start_wait(&self) -> Duration {
        Duration::from_secs(self.cold_start_wait_secs)
    }

    pub fn recovery_settle(&self) -> Duration {
        Duration::from_secs(self.recovery_settle_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    pub program: String,
    /// Arguments placed before `-f`, e.g. `["compose"]` for the docker plugin.
    pub base_args: Vec<String>,
    /// Deployment descriptor that gets broken and restored.
    pub descriptor: PathBuf,
    /// Prune dangling images during cleanup.
    pub prune_images: bool,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            program: "docker-compose".to_string(),
            base_args: Vec::new(),
            descriptor: PathBuf::from("docker-compose.test.yml"),
            prune_images: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    pub enabled: bool,
    pub program: String,
    pub deployment: String,
    pub namespace: String,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "kubectl".to_string(),
            deployment: "cicd-pipeline-app".to_string(),
            namespace: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitOpsSettings {
    pub enabled: bool,
    pub program: String,
    pub app: String,
}

impl Default for GitOpsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "argocd".to_string(),
            app: "cicd-pipeline-python".to_string(),
        }
    }
}

impl ScenarioSettings {
    /// Parse settings from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load the file layer.
    ///
    /// An explicit path must exist. Without one, `./rollcheck.toml` is used
    /// when present and the defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| SettingsError::Parse { path, source })
    }
}
