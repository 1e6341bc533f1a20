//! Bounded-retry polling primitive.
//!
//! All waiting on asynchronous cluster state goes through [`poll_until`]:
//! fixed-interval blocking probes until the condition reports a value or
//! the budget runs out. There are no event subscriptions anywhere in the
//! workflow; timeout exhaustion is the sole cancellation mechanism, and it
//! aborts only the waiting step, never cluster-side effects.
//!
//! Probes are read-only cluster queries. A transient query error must be
//! swallowed by the probe (return `None`, "not yet ready") rather than
//! propagated: only running out of budget yields failure.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Outcome of a bounded wait. Never partially valid: either the condition
/// converged within budget or it timed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    /// True if the probe reported a value before the budget ran out.
    pub succeeded: bool,
    /// The value observed on convergence, if any.
    pub last_observed: Option<String>,
}

impl PollResult {
    fn converged(value: String) -> Self {
        Self {
            succeeded: true,
            last_observed: Some(value),
        }
    }

    fn timed_out() -> Self {
        Self {
            succeeded: false,
            last_observed: None,
        }
    }
}

/// Probes `probe` at fixed intervals until it reports `Some(value)` or
/// `timeout` elapses. The first probe fires immediately; the last fires at
/// the timeout boundary itself, so a condition converging exactly at the
/// deadline still counts.
pub async fn poll_until<F, Fut>(mut probe: F, interval: Duration, timeout: Duration) -> PollResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<String>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return PollResult::converged(value);
        }
        if Instant::now() >= deadline {
            return PollResult::timed_out();
        }
        sleep(interval).await;
    }
}

/// Budget equivalent to a fixed attempt count at a given spacing: `n`
/// probes happen, the first immediately and the last after `n - 1` sleeps.
pub fn attempts_budget(attempts: u32, interval: Duration) -> Duration {
    interval * attempts.saturating_sub(1)
}
