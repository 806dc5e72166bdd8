// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Retry/backoff executor for fallible remote operations.
//!
//! Each failure is classified by the error type itself through [Classify]. The classification
//! picks the attempt budget and base delay: transient failures (network, timeouts) get a long
//! budget, failures rejected by remote logic a short one, and fatal failures (bad input) are
//! returned immediately. The delay after attempt `i` (zero-based) is `base_delay * 2^i`.

use std::{fmt, future::Future, time::Duration};

use thiserror::Error;

/// How a failure should be treated by the retry executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Network or timeout class failure. Retried with the transient budget.
    Transient,
    /// Rejected by remote logic. Retried with the smaller non-transient budget.
    NonTransient,
    /// Never retried.
    Fatal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::NonTransient => write!(f, "non-transient"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Errors that know how they should be retried.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

/// Attempt budget and exponential delay schedule for one class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Backoff {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts, base_delay }
    }

    /// Delay to wait after the zero-based `attempt` failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub transient: Backoff,
    pub non_transient: Backoff,
}

impl RetryPolicy {
    /// Policy that never retries. Useful for operations that must run at most once.
    pub const fn never() -> Self {
        Self {
            transient: Backoff::new(1, Duration::ZERO),
            non_transient: Backoff::new(1, Duration::ZERO),
        }
    }

    fn budget(&self, class: ErrorClass) -> Option<Backoff> {
        match class {
            ErrorClass::Transient => Some(self.transient),
            ErrorClass::NonTransient => Some(self.non_transient),
            ErrorClass::Fatal => None,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            transient: Backoff::new(5, Duration::from_millis(1000)),
            non_transient: Backoff::new(2, Duration::from_millis(300)),
        }
    }
}

/// The last error observed once the attempt budget is exhausted.
#[derive(Error, Debug)]
#[error("{class} failure after {attempts} attempt(s): {source}")]
pub struct RetryError<E> {
    pub class: ErrorClass,
    pub attempts: u32,
    #[source]
    pub source: E,
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        self.source
    }
}

/// Run `operation` until it succeeds or the budget for the class of its last failure is spent.
///
/// The budget is selected from the classification of the most recent failure, so an operation
/// that first times out and is then rejected by the remote ends after the rejection budget.
pub async fn execute<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Display,
{
    let mut attempts = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        attempts += 1;
        let class = err.class();
        let backoff = match policy.budget(class) {
            Some(backoff) if attempts < backoff.max_attempts => backoff,
            _ => return Err(RetryError { class, attempts, source: err }),
        };
        let delay = backoff.delay(attempts - 1);
        tracing::warn!(attempts, %class, ?delay, "operation failed, retrying: {err}");
        tokio::time::sleep(delay).await;
    }
}
