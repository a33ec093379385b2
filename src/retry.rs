//! Bounded retry and ordered fallback helpers
//!
//! Focus polling, remote completion calls and mail client fallback all run
//! through these two combinators.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Delay between two consecutive attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `base * attempt`
    Linear(Duration),
}

impl Backoff {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Linear(base) => base.saturating_mul(attempt),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(interval),
        }
    }

    pub fn linear(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear(base),
        }
    }
}

/// Outcome of an attempt that did not succeed
#[derive(Debug)]
pub enum Attempt<E> {
    /// Try again while attempts remain
    Retry(E),
    /// Stop immediately
    Abort(E),
}

#[derive(Debug)]
pub enum RetryError<E> {
    Exhausted { attempts: u32, last: E },
    Aborted { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Aborted { attempt, .. } => *attempt,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Aborted { error, .. } => error,
        }
    }
}

/// Run `op` until it succeeds, aborts, or `policy.max_attempts` is reached.
///
/// `op` receives the 1-based attempt number. `wait` is called between attempts
/// with the backoff delay, never after the last one.
pub async fn retry<T, E, Op, Fut, Wait, WaitFut>(
    policy: RetryPolicy,
    mut op: Op,
    mut wait: Wait,
) -> Result<T, RetryError<E>>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
    Wait: FnMut(Duration) -> WaitFut,
    WaitFut: Future<Output = ()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(Attempt::Abort(error)) => return Err(RetryError::Aborted { attempt, error }),
            Err(Attempt::Retry(last)) => {
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last,
                    });
                }
                wait(policy.backoff.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}

/// Every strategy failed; failures are kept in the order they were tried
#[derive(Debug)]
pub struct FallbackError<E> {
    pub failures: Vec<E>,
}

impl<E: fmt::Display> fmt::Display for FallbackError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no strategies to try");
        }
        let joined = self
            .failures
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for FallbackError<E> {}

/// Try each strategy in order and return the first success
pub async fn first_success<S, T, E, F, Fut>(
    strategies: impl IntoIterator<Item = S>,
    mut run: F,
) -> Result<T, FallbackError<E>>
where
    F: FnMut(S) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures = Vec::new();
    for strategy in strategies {
        match run(strategy).await {
            Ok(value) => return Ok(value),
            Err(e) => failures.push(e),
        }
    }
    Err(FallbackError { failures })
}

/// Synchronous counterpart of [`first_success`]
pub fn first_ok<S, T, E>(
    strategies: impl IntoIterator<Item = S>,
    mut run: impl FnMut(S) -> Result<T, E>,
) -> Result<T, FallbackError<E>> {
    let mut failures = Vec::new();
    for strategy in strategies {
        match run(strategy) {
            Ok(value) => return Ok(value),
            Err(e) => failures.push(e),
        }
    }
    Err(FallbackError { failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_retry_exhausts_exact_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(
            RetryPolicy::fixed(5, Duration::from_millis(400)),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Attempt::Retry("missing")) }
            },
            |_| async {},
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(err.into_inner(), "missing");
    }

    #[tokio::test]
    async fn test_retry_stops_on_first_success() {
        let calls = AtomicU32::new(0);
        let result = retry(
            RetryPolicy::fixed(5, Duration::ZERO),
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 3 {
                        Ok(attempt)
                    } else {
                        Err(Attempt::Retry(()))
                    }
                }
            },
            |_| async {},
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_abort_skips_remaining_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(
            RetryPolicy::linear(3, Duration::from_secs(3)),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Attempt::Abort("quota")) }
            },
            |_| async {},
        )
        .await;

        assert!(matches!(result, Err(RetryError::Aborted { attempt: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_linear_backoff_waits_between_attempts_only() {
        let waits = Mutex::new(Vec::new());
        let _: Result<(), _> = retry(
            RetryPolicy::linear(3, Duration::from_millis(3000)),
            |_| async { Err(Attempt::Retry(())) },
            |delay| {
                waits.lock().unwrap().push(delay);
                async {}
            },
        )
        .await;

        assert_eq!(
            *waits.lock().unwrap(),
            vec![Duration::from_millis(3000), Duration::from_millis(6000)]
        );
    }

    #[tokio::test]
    async fn test_first_success_returns_first_ok_in_order() {
        let tried = Mutex::new(Vec::new());
        let result = first_success(["gmail", "outlook", "thunderbird"], |name| {
            tried.lock().unwrap().push(name);
            async move {
                if name == "outlook" {
                    Ok(name)
                } else {
                    Err(format!("{} failed", name))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "outlook");
        assert_eq!(*tried.lock().unwrap(), vec!["gmail", "outlook"]);
    }

    #[tokio::test]
    async fn test_first_success_aggregates_failures() {
        let result: Result<(), _> =
            first_success(["a", "b"], |name| async move { Err(format!("{} down", name)) }).await;

        let err = result.unwrap_err();
        assert_eq!(err.failures.len(), 2);
        assert_eq!(err.to_string(), "a down; b down");
    }

    #[test]
    fn test_first_ok_sync() {
        let parsed = first_ok(["x", "42"], |s| s.parse::<i32>());
        assert_eq!(parsed.unwrap(), 42);

        let failed = first_ok(Vec::<&str>::new(), |s| s.parse::<i32>());
        assert_eq!(failed.unwrap_err().to_string(), "no strategies to try");
    }
}
