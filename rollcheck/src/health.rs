//! Health prober: fixed-delay polling of the target's `/health`.

use std::time::Duration;

use rollcheck_common::HealthStatus;
use tracing::{debug, info, warn};

use crate::target::{ProbeError, Target};

/// Result of a polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSummary {
    pub status: HealthStatus,
    pub attempts: u32,
}

/// Call `attempt` until it succeeds or `max_attempts` are used.
///
/// Sleeps `delay` between attempts, never after the last one. When every
/// attempt fails, the status is `Unreachable` if the final failure was a
/// transport error and `Unhealthy` otherwise.
pub fn poll_until_healthy<F>(max_attempts: u32, delay: Duration, mut attempt: F) -> ProbeSummary
where
    F: FnMut(u32) -> Result<(), ProbeError>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_error: Option<ProbeError> = None;

    for n in 1..=max_attempts {
        match attempt(n) {
            Ok(()) => {
                info!(attempt = n, max_attempts, "Target is healthy");
                return ProbeSummary {
                    status: HealthStatus::Healthy,
                    attempts: n,
                };
            }
            Err(err) => {
                debug!(attempt = n, max_attempts, error = %err, "Health probe failed");
                last_error = Some(err);
            }
        }
        if n < max_attempts && !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    let status = match &last_error {
        Some(err) if !err.is_transport() => HealthStatus::Unhealthy,
        _ => HealthStatus::Unreachable,
    };
    warn!(
        attempts = max_attempts,
        status = %status,
        last_error = ?last_error,
        "Target did not become healthy"
    );
    ProbeSummary {
        status,
        attempts: max_attempts,
    }
}

/// Probe `target` up to `max_attempts` times.
///
/// Exhaustion reports `Unreachable` only when the last attempt got no HTTP
/// answer; a target that answered but was never healthy is `Unhealthy`.
pub fn probe(target: &Target, max_attempts: u32, delay: Duration) -> ProbeSummary {
    debug!(url = target.base_url(), max_attempts, "Probing target health");
    poll_until_healthy(max_attempts, delay, |_| target.probe_health())
}
