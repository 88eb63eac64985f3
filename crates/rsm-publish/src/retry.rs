//! Bounded retry with a fixed backoff.
//!
//! Shared by message creation and message updates. The caller supplies the
//! operation and a classifier; only errors classified transient are
//! retried, and the backoff is slept between attempts, never after the last.

use std::fmt;
use std::future::Future;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. `0` is treated as `1`.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
    /// A non-retryable error ended the sequence early.
    Permanent { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    pub fn error(&self) -> &E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Permanent { error, .. } => error,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            RetryError::Permanent { attempt, error } => {
                write!(f, "permanent failure on attempt {attempt}: {error}")
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

pub async fn with_retry<T, E, F, Fut, C>(
    policy: RetryPolicy,
    is_transient: C,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if !is_transient(&e) => {
                return Err(RetryError::Permanent { attempt, error: e })
            }
            Err(e) if attempt >= max => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                })
            }
            Err(_) => {
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}
