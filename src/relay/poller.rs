// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Settlement Poller
//!
//! Bounded retry loop over an arbitrary async query. The relay uses it to
//! wait for the settlement venue to credit the ephemeral identity, but the
//! loop knows nothing about ledgers: it runs `query`, tests the value with
//! `predicate`, and sleeps `interval` between attempts.
//!
//! ## Failure handling
//!
//! - A query error is logged and counts as a failed attempt; it never ends
//!   the loop early.
//! - Exhausting `max_attempts` yields [`PollError::Timeout`] with the last
//!   observed value and error.
//! - The cancellation token is observed only while sleeping. A query in
//!   flight always runs to completion.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fixed-interval retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Upper bound on the time spent sleeping.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    /// 30 attempts, 5 seconds apart.
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 30)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<T> {
    Timeout {
        attempts: u32,
        last_value: Option<T>,
        last_error: Option<String>,
    },
    Cancelled {
        attempts: u32,
    },
}

/// Run `query` until `predicate` accepts its value or the policy runs out.
pub async fn poll_until<T, E, Q, Fut, P>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut query: Q,
    mut predicate: P,
) -> Result<T, PollError<T>>
where
    T: Debug,
    E: Display,
    Q: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
{
    let mut last_value = None;
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        match query().await {
            Ok(value) if predicate(&value) => {
                debug!(attempt, "Poll condition met");
                return Ok(value);
            }
            Ok(value) => {
                debug!(attempt, value = ?value, "Poll condition not met yet");
                last_value = Some(value);
            }
            Err(e) => {
                warn!(attempt, error = %e, "Poll attempt failed");
                last_error = Some(e.to_string());
            }
        }

        if attempt == policy.max_attempts {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(policy.interval) => {},
            _ = cancel.cancelled() => {
                return Err(PollError::Cancelled { attempts: attempt });
            }
        }
    }

    Err(PollError::Timeout {
        attempts: policy.max_attempts,
        last_value,
        last_error,
    })
}
