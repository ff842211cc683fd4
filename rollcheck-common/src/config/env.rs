//! Environment variable parsing with type safety.
//!
//! Provides a type-safe parser for `ROLLCHECK_*` variables that collects
//! every invalid value so all issues can be reported at once.

use super::{ScenarioSettings, SettingsError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during environment variable parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// Invalid value for a variable.
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: &'static str,
        value: String,
    },

    /// Value out of valid range.
    #[error("Value out of range for {var}: {value} (valid: {min}..={max})")]
    OutOfRange {
        var: String,
        value: u64,
        min: u64,
        max: u64,
    },
}

/// Type-safe environment variable parser.
///
/// Reads through a lookup function so tests never touch the process
/// environment.
pub struct EnvParser<F> {
    prefix: &'static str,
    lookup: F,
    errors: Vec<EnvError>,
}

impl EnvParser<fn(&str) -> Option<String>> {
    /// Parser over the real process environment.
    pub fn from_process_env() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }
}

impl<F> EnvParser<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Create a parser with the ROLLCHECK_ prefix over a custom lookup.
    pub fn with_lookup(lookup: F) -> Self {
        Self {
            prefix: "ROLLCHECK_",
            lookup,
            errors: Vec::new(),
        }
    }

    /// Take ownership of errors.
    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn raw(&self, name: &str) -> Option<(String, String)> {
        let var = self.var_name(name);
        (self.lookup)(&var).map(|value| (var, value))
    }

    /// Non-empty string value, if set.
    pub fn get_string(&mut self, name: &str) -> Option<String> {
        self.raw(name)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Boolean value, if set.
    ///
    /// Accepts: 1, true, yes, on (for true)
    ///          0, false, no, off (for false)
    pub fn get_bool(&mut self, name: &str) -> Option<bool> {
        let (var, value) = self.raw(name)?;
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => {
                self.errors.push(EnvError::InvalidValue {
                    var,
                    expected: "boolean (true/false/1/0/yes/no)",
                    value,
                });
                None
            }
        }
    }

    /// Unsigned value within `min..=max`, if set.
    pub fn get_u64_range(&mut self, name: &str, min: u64, max: u64) -> Option<u64> {
        let (var, value) = self.raw(name)?;
        match value.trim().parse::<u64>() {
            Ok(n) if (min..=max).contains(&n) => Some(n),
            Ok(n) => {
                self.errors.push(EnvError::OutOfRange {
                    var,
                    value: n,
                    min,
                    max,
                });
                None
            }
            Err(_) => {
                self.errors.push(EnvError::InvalidValue {
                    var,
                    expected: "unsigned integer",
                    value,
                });
                None
            }
        }
    }

    pub fn get_u32_range(&mut self, name: &str, min: u32, max: u32) -> Option<u32> {
        self.get_u64_range(name, u64::from(min), u64::from(max))
            .and_then(|n| u32::try_from(n).ok())
    }
}

/// Apply `ROLLCHECK_*` overrides on top of the file layer.
pub fn apply_env_overrides<F>(
    settings: &mut ScenarioSettings,
    mut env: EnvParser<F>,
) -> Result<(), SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env.get_string("URL") {
        settings.target.url = url;
    }
    if let Some(attempts) = env.get_u32_range("HEALTH_ATTEMPTS", 1, 1000) {
        settings.health.max_attempts = attempts;
    }
    if let Some(delay) = env.get_u64_range("HEALTH_DELAY_MS", 0, 600_000) {
        settings.health.delay_ms = delay;
    }
    if let Some(secs) = env.get_u64_range("COMMAND_TIMEOUT_SECS", 1, 86_400) {
        settings.timing.command_timeout_secs = secs;
    }
    if let Some(secs) = env.get_u64_range("COLD_START_WAIT_SECS", 0, 3_600) {
        settings.timing.cold_start_wait_secs = secs;
    }
    if let Some(secs) = env.get_u64_range("RECOVERY_SETTLE_SECS", 0, 3_600) {
        settings.timing.recovery_settle_secs = secs;
    }
    if let Some(program) = env.get_string("COMPOSE_PROGRAM") {
        settings.compose.program = program;
    }
    if let Some(file) = env.get_string("COMPOSE_FILE") {
        settings.compose.descriptor = PathBuf::from(file);
    }
    if let Some(enabled) = env.get_bool("CLUSTER_ENABLED") {
        settings.cluster.enabled = enabled;
    }
    if let Some(deployment) = env.get_string("K8S_DEPLOYMENT") {
        settings.cluster.deployment = deployment;
    }
    if let Some(namespace) = env.get_string("K8S_NAMESPACE") {
        settings.cluster.namespace = namespace;
    }
    if let Some(enabled) = env.get_bool("GITOPS_ENABLED") {
        settings.gitops.enabled = enabled;
    }
    if let Some(app) = env.get_string("ARGOCD_APP") {
        settings.gitops.app = app;
    }
    if let Some(extended) = env.get_bool("EXTENDED_CHECKS") {
        settings.extended_checks = extended;
    }

    let errors = env.take_errors();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SettingsError::Env(errors))
    }
}
