//! Recovery verifier: a single pass of functional checks against the target.

use std::fmt;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::target::{HttpMethod, Target};

/// One statically declared request and what it must answer.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCheck {
    pub method: HttpMethod,
    pub path: &'static str,
    pub body: Option<Value>,
    pub expected_status: u16,
    /// Top-level JSON fields the response body must carry.
    pub expected_fields: &'static [&'static str],
}

impl EndpointCheck {
    pub fn get(path: &'static str, expected_status: u16) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            body: None,
            expected_status,
            expected_fields: &[],
        }
    }

    pub fn post(path: &'static str, body: Value, expected_status: u16) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            body: Some(body),
            expected_status,
            expected_fields: &[],
        }
    }

    pub fn with_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.expected_fields = fields;
        self
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Health, greeting and a simple calculation.
pub fn default_checks() -> Vec<EndpointCheck> {
    vec![
        EndpointCheck::get("/health", 200).with_fields(&["status", "timestamp", "version"]),
        EndpointCheck::get("/api/hello", 200).with_fields(&["message", "version"]),
        EndpointCheck::post(
            "/api/calculate",
            json!({"operation": "add", "a": 2, "b": 3}),
            200,
        )
        .with_fields(&["result", "operation"]),
    ]
}

/// Negative paths the target must reject cleanly.
pub fn extended_checks() -> Vec<EndpointCheck> {
    vec![
        EndpointCheck::post(
            "/api/calculate",
            json!({"operation": "divide", "a": 10, "b": 0}),
            400,
        )
        .with_fields(&["error"]),
        EndpointCheck::post(
            "/api/calculate",
            json!({"operation": "power", "a": 2, "b": 3}),
            400,
        )
        .with_fields(&["error"]),
        EndpointCheck::post("/api/calculate", json!({"operation": "add", "a": 5}), 400)
            .with_fields(&["error"]),
        EndpointCheck::get("/api/nonexistent", 404),
    ]
}

/// The battery for a run: defaults, plus the negative paths when asked.
pub fn battery(extended: bool) -> Vec<EndpointCheck> {
    let mut checks = default_checks();
    if extended {
        checks.extend(extended_checks());
    }
    checks
}

/// Why one check did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Unreachable(String),
    Status { expected: u16, actual: u16 },
    MissingFields(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    pub check: String,
    pub mismatch: Mismatch,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mismatch {
            Mismatch::Unreachable(error) => write!(f, "{}: {}", self.check, error),
            Mismatch::Status { expected, actual } => {
                write!(f, "{}: expected {}, got {}", self.check, expected, actual)
            }
            Mismatch::MissingFields(fields) => {
                write!(f, "{}: missing fields {}", self.check, fields.join(", "))
            }
        }
    }
}

fn run_check(target: &Target, check: &EndpointCheck) -> Result<(), Mismatch> {
    let reply = target
        .request(check.method, check.path, check.body.as_ref())
        .map_err(|e| Mismatch::Unreachable(e.to_string()))?;
    if reply.status != check.expected_status {
        return Err(Mismatch::Status {
            expected: check.expected_status,
            actual: reply.status,
        });
    }
    if check.expected_fields.is_empty() {
        return Ok(());
    }
    let body = reply.json().unwrap_or(Value::Null);
    let missing: Vec<_> = check
        .expected_fields
        .iter()
        .copied()
        .filter(|field| body.get(field).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Mismatch::MissingFields(missing))
    }
}

/// Run every check once and collect all failures; empty means recovered.
pub fn verify(target: &Target, checks: &[EndpointCheck]) -> Vec<CheckFailure> {
    let mut failures = Vec::new();
    for check in checks {
        match run_check(target, check) {
            Ok(()) => debug!(check = %check.label(), "Recovery check passed"),
            Err(mismatch) => {
                let failure = CheckFailure {
                    check: check.label(),
                    mismatch,
                };
                warn!(failure = %failure, "Recovery check failed");
                failures.push(failure);
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTarget, closed_port};
    use std::time::Duration;

    #[test]
    fn test_default_battery_passes_against_mock() {
        let mock = MockTarget::start();
        assert!(verify(&mock.target(), &default_checks()).is_empty());
        assert_eq!(mock.requests_to("/api/calculate"), 1);
    }

    #[test]
    fn test_extended_battery_passes_against_mock() {
        let mock = MockTarget::start();
        let checks = battery(true);
        assert_eq!(checks.len(), 7);
        assert!(verify(&mock.target(), &checks).is_empty());
        assert_eq!(mock.requests_to("/api/nonexistent"), 1);
    }

    #[test]
    fn test_one_500_names_the_failing_check() {
        let mock = MockTarget::start();
        mock.override_status("/api/hello", 500);
        let failures = verify(&mock.target(), &default_checks());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].check, "GET /api/hello");
        assert_eq!(
            failures[0].mismatch,
            Mismatch::Status {
                expected: 200,
                actual: 500
            }
        );
        assert_eq!(failures[0].to_string(), "GET /api/hello: expected 200, got 500");
    }

    #[test]
    fn test_collects_all_failures() {
        let target = Target::new(
            &format!("http://127.0.0.1:{}", closed_port()),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let failures = verify(&target, &default_checks());
        assert_eq!(failures.len(), 3);
        assert!(failures
            .iter()
            .all(|f| matches!(f.mismatch, Mismatch::Unreachable(_))));
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let mock = MockTarget::start();
        let check = EndpointCheck::get("/api/hello", 200).with_fields(&["message", "uptime"]);
        let failures = verify(&mock.target(), &[check]);
        assert_eq!(failures[0].mismatch, Mismatch::MissingFields(vec!["uptime"]));
    }
}
