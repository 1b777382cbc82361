//! Bounded retry for operations that race with USB enumeration.
//!
//! Right after a port reset or cycle the device is typically absent or busy
//! for a short while. Only [retryable](crate::D3xxError::is_retryable) errors
//! are retried; anything else is returned immediately.

use std::{thread, time::Duration};

use log::warn;

use crate::{D3xxError, Result};

/// Configuration for [`retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Values below 1 count as 1.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Set the attempt ceiling.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay between attempts.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// A policy that tries exactly once.
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds, fails with a terminal error, or the attempt
/// ceiling is reached.
///
/// `op` receives the 1-based attempt number. After the last attempt fails
/// with a retryable error, [`D3xxError::RetriesExhausted`] is returned
/// wrapping that error.
///
/// ```
/// use std::time::Duration;
/// use ftd3xx_control::{retry, D3xxError, RetryPolicy};
///
/// let policy = RetryPolicy::default().with_backoff(Duration::ZERO);
/// let value = retry(&policy, |attempt| {
///     if attempt < 3 {
///         Err(D3xxError::from_status(2))
///     } else {
///         Ok(attempt)
///     }
/// });
/// assert_eq!(value, Ok(3));
/// ```
pub fn retry<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                warn!("giving up after {attempt} attempts: {err}");
                return Err(D3xxError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                warn!(
                    "attempt {attempt}/{max_attempts} failed: {err} (retry in {:.1}s)",
                    policy.backoff.as_secs_f64()
                );
                thread::sleep(policy.backoff);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(max_attempts)
            .with_backoff(Duration::ZERO)
    }

    #[test]
    fn default_policy_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 20);
        assert_eq!(policy.backoff, Duration::from_millis(100));
    }

    #[test]
    fn terminal_error_is_not_retried() {
        let mut calls = 0;
        let result: Result<()> = retry(&fast(5), |_| {
            calls += 1;
            Err(D3xxError::from_status(1))
        });
        assert_eq!(result, Err(D3xxError::from_status(1)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn exhaustion_wraps_last_error() {
        let mut calls = 0;
        let result: Result<()> = retry(&fast(4), |_| {
            calls += 1;
            Err(D3xxError::from_status(27))
        });
        let err = result.unwrap_err();
        assert_eq!(calls, 4);
        assert_eq!(err.kind(), ErrorKind::DeviceBusy);
        assert!(!err.is_retryable());
        assert!(matches!(
            err,
            D3xxError::RetriesExhausted { attempts: 4, .. }
        ));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let result: Result<()> = retry(&fast(0), |_| {
            calls += 1;
            Err(D3xxError::from_status(2))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn once_policy() {
        assert_eq!(RetryPolicy::once().max_attempts, 1);
    }
}
