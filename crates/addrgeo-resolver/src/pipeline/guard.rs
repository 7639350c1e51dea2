//! Per-call time budgets for collaborator calls.

use std::future::Future;
use std::time::Duration;

use addrgeo_core::CollaboratorError;
use tokio::time::Instant;

/// Time budget for the next call, or `None` once the deadline has passed.
pub(crate) fn call_budget(call_timeout: Duration, deadline: Option<Instant>) -> Option<Duration> {
    match deadline {
        None => Some(call_timeout),
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            (!remaining.is_zero()).then(|| remaining.min(call_timeout))
        }
    }
}

/// Await a collaborator call within `budget`.
///
/// Errors and timeouts are logged and collapse to `None`, as does a missing
/// budget (the call is never polled).
pub(crate) async fn guarded<T, F>(service: &'static str, budget: Option<Duration>, call: F) -> Option<T>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    let Some(budget) = budget else {
        tracing::warn!(service, "deadline passed, skipping call");
        return None;
    };

    match tokio::time::timeout(budget, call).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::warn!(service, error = %e, "collaborator call failed");
            None
        }
        Err(_) => {
            let e = CollaboratorError::Timeout {
                service,
                timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            };
            tracing::warn!(service, error = %e, "collaborator call timed out");
            None
        }
    }
}
