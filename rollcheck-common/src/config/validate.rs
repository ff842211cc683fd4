//! Validation of assembled settings.
//!
//! Backend commands are built from static templates plus the names checked
//! here, so nothing reaching a command line comes from untrusted input.

use super::{ScenarioSettings, SettingsError};
use regex::Regex;
use std::sync::LazyLock;

/// RFC 1123 label, as accepted for Kubernetes names and namespaces.
static DNS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$").expect("valid DNS label regex")
});

/// Argo CD application name, optionally qualified with `<namespace>/`.
static APP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]([-a-z0-9]*[a-z0-9])?/)?[a-z0-9]([-a-z0-9.]*[a-z0-9])?$")
        .expect("valid app name regex")
});

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn check_program(field: &'static str, program: &str) -> Result<(), SettingsError> {
    if program.is_empty() {
        return Err(invalid(field, "program must not be empty"));
    }
    if program.chars().any(char::is_whitespace) {
        return Err(invalid(
            field,
            format!("'{program}' contains whitespace; put extra arguments in base_args"),
        ));
    }
    Ok(())
}

/// Reject settings that would produce unsafe or meaningless commands.
pub fn validate_settings(settings: &ScenarioSettings) -> Result<(), SettingsError> {
    let url = settings.target.url.as_str();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid("target.url", format!("'{url}' is not an http(s) URL")));
    }
    if settings.target.probe_timeout_secs == 0 || settings.target.check_timeout_secs == 0 {
        return Err(invalid("target", "request timeouts must be at least one second"));
    }
    if settings.health.max_attempts == 0 {
        return Err(invalid("health.max_attempts", "at least one attempt is required"));
    }
    if settings.timing.command_timeout_secs == 0 {
        return Err(invalid("timing.command_timeout_secs", "must be positive"));
    }

    check_program("compose.program", &settings.compose.program)?;
    if settings.compose.descriptor.as_os_str().is_empty() {
        return Err(invalid("compose.descriptor", "descriptor path must not be empty"));
    }

    if settings.cluster.enabled {
        check_program("cluster.program", &settings.cluster.program)?;
        if !DNS_LABEL.is_match(&settings.cluster.deployment) {
            return Err(invalid(
                "cluster.deployment",
                format!("'{}' is not a valid resource name", settings.cluster.deployment),
            ));
        }
        if !DNS_LABEL.is_match(&settings.cluster.namespace) {
            return Err(invalid(
                "cluster.namespace",
                format!("'{}' is not a valid namespace", settings.cluster.namespace),
            ));
        }
    }

    if settings.gitops.enabled {
        check_program("gitops.program", &settings.gitops.program)?;
        if !APP_NAME.is_match(&settings.gitops.app) {
            return Err(invalid(
                "gitops.app",
                format!("'{}' is not a valid application name", settings.gitops.app),
            ));
        }
    }

    Ok(())
}
