//! Bounded retry for transaction submission.
//!
//! Modeled as an explicit state machine rather than a `loop { break }`
//! construction: every transition is visible and the attempt bound is
//! enforced structurally.

use std::future::Future;

use tracing::warn;

/// Where a retried operation currently stands.
#[derive(Debug)]
enum RetryState<T, E> {
    /// About to run the numbered attempt.
    Attempting(u32),
    /// The previous attempt failed transiently; another one is allowed.
    Retrying { next: u32, last_error: E },
    Succeeded(T),
    Failed(E),
}

/// Runs `attempt` up to `max_attempts` times, retrying only errors the
/// `is_transient` predicate accepts. The final error is surfaced
/// unchanged once attempts are exhausted.
pub async fn run_with_retries<T, E, Fut>(
    max_attempts: u32,
    is_transient: impl Fn(&E) -> bool,
    mut attempt: impl FnMut(u32) -> Fut,
) -> Result<T, E>
where
    E: std::fmt::Display,
    Fut: Future<Output = Result<T, E>>,
{
    assert!(max_attempts >= 1, "at least one attempt is required");
    let mut state = RetryState::Attempting(1);
    loop {
        state = match state {
            RetryState::Attempting(number) => match attempt(number).await {
                Ok(value) => RetryState::Succeeded(value),
                Err(error) if number < max_attempts && is_transient(&error) => {
                    RetryState::Retrying {
                        next: number + 1,
                        last_error: error,
                    }
                }
                Err(error) => RetryState::Failed(error),
            },
            RetryState::Retrying { next, last_error } => {
                warn!(
                    attempt = next - 1,
                    max_attempts,
                    error = %last_error,
                    "transient failure, retrying"
                );
                RetryState::Attempting(next)
            }
            RetryState::Succeeded(value) => return Ok(value),
            RetryState::Failed(error) => return Err(error),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("transient")]
        Transient,
        #[error("fatal")]
        Fatal,
    }

    fn is_transient(error: &TestError) -> bool {
        matches!(error, TestError::Transient)
    }

    #[tokio::test]
    async fn succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let result = run_with_retries(3, is_transient, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TestError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_up_to_the_bound() {
        let calls = AtomicU32::new(0);
        let result = run_with_retries(3, is_transient, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(TestError::Transient)
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausting_the_bound_surfaces_the_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retries(3, is_transient, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Transient) }
        })
        .await;
        assert!(matches!(result, Err(TestError::Transient)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retries(3, is_transient, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Fatal) }
        })
        .await;
        assert!(matches!(result, Err(TestError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
