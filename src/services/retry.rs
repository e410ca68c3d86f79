// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bounded retry with fixed backoff.
//!
//! Every attempt runs under its own timeout; a timeout counts as a failed
//! attempt. After the last attempt the final error text is returned along
//! with the attempt count.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How often and how patiently to retry an external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
    /// Deadline for a single attempt
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            attempt_timeout,
        }
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, 1 second apart, 30 seconds each.
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// All attempts failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{operation} failed after {attempts} attempt(s): {last_error}")]
pub struct RetryError {
    pub operation: String,
    pub attempts: u32,
    pub last_error: String,
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let last_error = match tokio::time::timeout(policy.attempt_timeout, operation()).await {
            Ok(Ok(value)) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", policy.attempt_timeout),
        };

        if attempt >= max_attempts {
            tracing::error!(
                operation = operation_name,
                attempts = attempt,
                error = %last_error,
                "Operation failed: retry budget exhausted"
            );
            return Err(RetryError {
                operation: operation_name.to_string(),
                attempts: attempt,
                last_error,
            });
        }

        tracing::warn!(
            operation = operation_name,
            attempt,
            max_attempts,
            backoff_ms = policy.delay.as_millis() as u64,
            error = %last_error,
            "Attempt failed, will retry after backoff"
        );

        tokio::time::sleep(policy.delay).await;
    }
}
