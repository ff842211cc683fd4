//! HTTP access to the system under test.

use std::time::Duration;

use rollcheck_common::config::TargetSettings;
use serde_json::Value;
use thiserror::Error;
use ureq::Agent;

/// Why a single health probe or request did not produce a usable answer.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No HTTP exchange happened (connection refused, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("unreadable body: {0}")]
    Body(String),

    #[error("reported status '{0}'")]
    NotHealthy(String),
}

impl ProbeError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Blocking HTTP client bound to one base URL.
///
/// Health probes and recovery checks use separate agents so each gets its
/// own per-request timeout. Non-2xx statuses are returned, not raised.
#[derive(Clone)]
pub struct Target {
    base_url: String,
    probe_agent: Agent,
    check_agent: Agent,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn agent(timeout: Duration) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    Agent::new_with_config(config)
}

impl Target {
    pub fn new(base_url: &str, probe_timeout: Duration, check_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            probe_agent: agent(probe_timeout),
            check_agent: agent(check_timeout),
        }
    }

    pub fn from_settings(settings: &TargetSettings) -> Self {
        Self::new(
            &settings.url,
            settings.probe_timeout(),
            settings.check_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// One `GET /health`; `Ok` only for 200 with `status == "healthy"`.
    pub fn probe_health(&self) -> Result<(), ProbeError> {
        let reply = self.send(&self.probe_agent, HttpMethod::Get, "/health", None)?;
        if reply.status != 200 {
            return Err(ProbeError::Status(reply.status));
        }
        let body: Value =
            serde_json::from_str(&reply.body).map_err(|e| ProbeError::Body(e.to_string()))?;
        match body.get("status").and_then(Value::as_str) {
            Some("healthy") => Ok(()),
            Some(other) => Err(ProbeError::NotHealthy(other.to_string())),
            None => Err(ProbeError::Body("missing 'status' field".to_string())),
        }
    }

    /// Single request with the recovery-check timeout.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<HttpReply, ProbeError> {
        self.send(&self.check_agent, method, path, body)
    }

    fn send(
        &self,
        agent: &Agent,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<HttpReply, ProbeError> {
        let url = self.url(path);
        let result = match (method, body) {
            (HttpMethod::Get, _) => agent.get(url.as_str()).call(),
            (HttpMethod::Post, Some(body)) => agent.post(url.as_str()).send_json(body),
            (HttpMethod::Post, None) => agent.post(url.as_str()).send_empty(),
        };
        let mut response = result.map_err(|e| ProbeError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ProbeError::Body(e.to_string()))?;
        Ok(HttpReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTarget;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let target = Target::new(
            "http://localhost:5000/",
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert_eq!(target.url("/health"), "http://localhost:5000/health");
    }

    #[test]
    fn test_probe_healthy_mock() {
        let mock = MockTarget::start();
        let target = mock.target();
        assert!(target.probe_health().is_ok());
        assert_eq!(mock.health_requests(), 1);
    }

    #[test]
    fn test_probe_reports_status_errors() {
        let mock = MockTarget::start();
        mock.fail_health(1);
        let err = mock.target().probe_health().unwrap_err();
        assert!(matches!(err, ProbeError::Status(503)));
    }

    #[test]
    fn test_closed_port_is_transport_error() {
        let target = Target::new(
            &format!("http://127.0.0.1:{}", crate::testing::closed_port()),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let err = target.probe_health().unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_post_json_returns_non_2xx_without_error() {
        let mock = MockTarget::start();
        let reply = mock
            .target()
            .request(
                HttpMethod::Post,
                "/api/calculate",
                Some(&serde_json::json!({"operation": "divide", "a": 1, "b": 0})),
            )
            .unwrap();
        assert_eq!(reply.status, 400);
        assert!(reply.json().unwrap().get("error").is_some());
    }
}
