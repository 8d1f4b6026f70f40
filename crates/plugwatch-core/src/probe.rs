//! Bounded readiness wait

use std::future::Future;
use std::time::Duration;

use plugwatch_client::ManagementApi;
use tracing::{debug, error, info, warn};

/// Result of a single readiness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Ready,
    /// Endpoint unreachable or still starting; worth another attempt
    NotReady(String),
    /// Endpoint answered with something that is not the expected API
    Malformed(String),
}

/// Attempt budget for [`wait_until_ready`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub max_attempts: u32,
    /// Pause between failed attempts
    pub interval: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            interval: Duration::from_secs(10),
        }
    }
}

/// Call `probe` until it reports ready or the budget runs out
///
/// Sleeps `policy.interval` after each not-ready attempt except the last.
/// A malformed response stops the wait immediately. Never fails; the caller
/// decides what a `false` means.
pub async fn wait_until_ready<F, Fut>(policy: &ProbePolicy, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeStatus>,
{
    for attempt in 1..=policy.max_attempts {
        match probe().await {
            ProbeStatus::Ready => {
                info!(attempt, "management API is ready");
                return true;
            }
            ProbeStatus::Malformed(reason) => {
                error!(attempt, reason = %reason, "unexpected response from management API");
                return false;
            }
            ProbeStatus::NotReady(reason) => {
                info!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    reason = %reason,
                    "management API not ready yet"
                );
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    warn!(
        max_attempts = policy.max_attempts,
        "management API did not become ready in time"
    );
    false
}

/// Probe the API with an unauthenticated version call
pub async fn probe_api(api: &dyn ManagementApi) -> ProbeStatus {
    match api.api_version().await {
        Ok(version) => {
            debug!(version = %version, "API version");
            ProbeStatus::Ready
        }
        Err(e) if e.is_malformed() => ProbeStatus::Malformed(e.to_string()),
        Err(e) => ProbeStatus::NotReady(e.to_string()),
    }
}
