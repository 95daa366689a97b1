//! Bounded poll-with-sleep loops for provider readiness checks.
//!
//! Both lifecycle managers watch for asynchronous, provider-driven state
//! transitions by polling with a fixed attempt cap and a fixed interval.
//! Exhausting the budget is never an error — the caller gets back the
//! best state observed and decides for itself. The loops hold no locks
//! and block only on `tokio::time::sleep`, so a caller wanting to abandon
//! one early can race it in a `select!` or drop the future; abandonment
//! does not roll back the already-submitted provider request.

use std::future::Future;
use std::time::Duration;

/// Fixed attempt cap and inter-attempt delay for one poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Node readiness: 5 attempts, 5 seconds apart.
    pub const fn node_readiness() -> Self {
        Self::new(5, Duration::from_secs(5))
    }

    /// Fleet activation: 10 attempts, 15 seconds apart.
    pub const fn fleet_active() -> Self {
        Self::new(10, Duration::from_secs(15))
    }
}

/// How a poll loop ended, with the number of checks actually performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition was observed true.
    Satisfied { polls: u32 },
    /// The attempt budget ran out with the condition still false.
    Exhausted { polls: u32 },
}

impl PollOutcome {
    pub fn is_satisfied(self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    pub fn polls(self) -> u32 {
        match self {
            Self::Satisfied { polls } | Self::Exhausted { polls } => polls,
        }
    }
}

/// Poll `check` until it returns true or the attempt cap is reached.
///
/// Sleeps `policy.interval` between attempts, never after the last one.
/// The check receives the 1-based attempt number.
pub async fn poll_until<F, Fut>(policy: PollPolicy, mut check: F) -> PollOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=policy.attempts {
        if check(attempt).await {
            return PollOutcome::Satisfied { polls: attempt };
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    PollOutcome::Exhausted {
        polls: policy.attempts,
    }
}

/// Like [`poll_until`], but the continuation condition is an inclusive-or
/// of "attempts remain" and "condition still false": when the budget runs
/// out with the condition unsatisfied, the loop is granted exactly one
/// final check past the cap before giving up. A never-satisfied check is
/// therefore polled `attempts + 1` times. The node-readiness loop depends
/// on this exact boundary.
pub async fn poll_until_grace<F, Fut>(policy: PollPolicy, mut check: F) -> PollOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut polls = 0u32;
    loop {
        polls += 1;
        if check(polls).await {
            return PollOutcome::Satisfied { polls };
        }
        if polls > policy.attempts {
            return PollOutcome::Exhausted { polls };
        }
        tokio::time::sleep(policy.interval).await;
    }
}
