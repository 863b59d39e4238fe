//! Unit tests for the read retry policy

use eggns::error::EggnsError;
use eggns::service::RetryPolicy;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn unavailable() -> EggnsError {
    EggnsError::ChainUnavailable {
        network_id: 0,
        reason: "connection refused".to_string(),
    }
}

/// What is tested: the delay doubles after each failed attempt
/// Why: backoff must grow as base * 2^(attempt - 1)
#[test]
fn test_delay_doubles() {
    let policy = RetryPolicy::new(5, Duration::from_millis(1000));
    assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
    assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
    assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
}

/// What is tested: a zero attempt budget is raised to one attempt
/// Why: the operation must run at least once
#[test]
fn test_attempts_clamped() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
}

/// What is tested: retryable errors are retried until success
/// Why: transient transport failures should be invisible to callers
#[tokio::test(start_paused = true)]
async fn test_retries_until_success() {
    let policy = RetryPolicy::new(3, Duration::from_millis(1000));
    let attempts = AtomicU32::new(0);

    let result = policy
        .run("read", || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(7)
            }
        })
        .await;

    assert_eq!(assert_ok!(result), 7);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

/// What is tested: the last retryable error is returned once the budget is spent
/// Why: callers must see the underlying failure
#[tokio::test(start_paused = true)]
async fn test_budget_exhausted() {
    let policy = RetryPolicy::new(3, Duration::from_millis(1000));
    let attempts = AtomicU32::new(0);

    let result: Result<(), _> = policy
        .run("read", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;

    assert_eq!(assert_err!(result), unavailable());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

/// What is tested: non-retryable errors fail on the first attempt
/// Why: reverts and validation errors are deterministic
#[tokio::test]
async fn test_non_retryable_not_retried() {
    let policy = RetryPolicy::new(3, Duration::from_millis(1000));
    let attempts = AtomicU32::new(0);

    let result: Result<(), _> = policy
        .run("read", || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(EggnsError::NameNotAvailable("alice".to_string()))
        })
        .await;

    assert!(matches!(result, Err(EggnsError::NameNotAvailable(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

/// What is tested: a first-try success returns without sleeping, from a blocking context
/// Why: the policy needs no runtime features beyond a current-thread executor
#[test]
fn test_first_attempt_success_blocking() {
    let policy = RetryPolicy::new(3, Duration::from_secs(60));

    let result = tokio_test::block_on(policy.run("read", || async { Ok::<_, EggnsError>("ok") }));

    assert_eq!(assert_ok!(result), "ok");
}
