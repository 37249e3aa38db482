//! Polling property-based and timing tests
//!
//! Time is paused, so sleeps advance a virtual clock and elapsed time can be
//! asserted exactly:
//! - a job that finishes after N waiting checks is returned after N+1 fetches
//! - a job that never finishes times out after exactly `max_attempts` fetches
//! - a failing job stops polling at the failing fetch
//! - fetch errors and cancellation end the poll immediately

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use farm_analysis_backend::services::polling::{poll_until_terminal, PollError, PollPolicy};
use farm_analysis_backend::AppError;
use proptest::prelude::*;
use shared::AnalysisState;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_secs(2);

fn policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: INTERVAL,
        max_attempts,
    }
}

/// State observed on the `n`th fetch (1-based) of a job that completes once
/// `waiting` checks have seen it unfinished
fn job_state(n: u32, waiting: u32) -> AnalysisState<u32> {
    match n {
        n if n > waiting => AnalysisState::Completed { result: n },
        1 => AnalysisState::Pending,
        _ => AnalysisState::Processing,
    }
}

// ============================================================================
// Timing tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_returns_after_n_plus_one_fetches() {
    let calls = AtomicU32::new(0);
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let result = poll_until_terminal(policy(30), &cancel, || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok::<_, AppError>(job_state(n, 4)) }
    })
    .await;

    assert_eq!(result.unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(start.elapsed(), INTERVAL * 4);
}

#[tokio::test(start_paused = true)]
async fn test_immediately_completed_job_needs_one_fetch() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result = poll_until_terminal(policy(30), &CancellationToken::new(), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, AppError>(AnalysisState::Completed { result: 1u32 }) }
    })
    .await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_times_out_after_exactly_max_attempts() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result = poll_until_terminal(policy(5), &CancellationToken::new(), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, AppError>(AnalysisState::<u32>::Processing) }
    })
    .await;

    assert!(matches!(result, Err(PollError::TimedOut { attempts: 5 })));
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    // No sleep after the final fetch
    assert_eq!(start.elapsed(), INTERVAL * 4);
}

#[tokio::test(start_paused = true)]
async fn test_stops_at_failing_fetch() {
    let calls = AtomicU32::new(0);

    let result = poll_until_terminal(policy(30), &CancellationToken::new(), || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            Ok::<_, AppError>(if n < 3 {
                AnalysisState::<u32>::Processing
            } else {
                AnalysisState::Failed {
                    error: "Satellite imagery unavailable for this date range".to_string(),
                }
            })
        }
    })
    .await;

    match result {
        Err(PollError::Failed(message)) => {
            assert_eq!(message, "Satellite imagery unavailable for this date range")
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_error_is_not_retried() {
    let calls = AtomicU32::new(0);

    let result = poll_until_terminal(policy(30), &CancellationToken::new(), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<AnalysisState<u32>, _>(AppError::NotFound("Analysis".to_string())) }
    })
    .await;

    assert!(matches!(result, Err(PollError::Fetch(AppError::NotFound(_)))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_sleep() {
    let calls = AtomicU32::new(0);
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            cancel.cancel();
        })
    };

    let result = poll_until_terminal(policy(100), &cancel, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, AppError>(AnalysisState::<u32>::Pending) }
    })
    .await;

    canceller.await.unwrap();
    assert!(matches!(result, Err(PollError::Cancelled)));
    // Fetches at t=0 and t=2, cancelled while sleeping towards t=4
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_first_fetch() {
    let calls = AtomicU32::new(0);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = poll_until_terminal(policy(30), &cancel, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, AppError>(AnalysisState::Completed { result: 1u32 }) }
    })
    .await;

    assert!(matches!(result, Err(PollError::Cancelled)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_polls_are_independent() {
    let cancel = CancellationToken::new();
    let fast_calls = AtomicU32::new(0);
    let slow_calls = AtomicU32::new(0);

    let fast = poll_until_terminal(policy(30), &cancel, || {
        let n = fast_calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok::<_, AppError>(job_state(n, 1)) }
    });
    let slow = poll_until_terminal(policy(30), &cancel, || {
        let n = slow_calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok::<_, AppError>(job_state(n, 6)) }
    });

    let (fast, slow) = tokio::join!(fast, slow);
    assert_eq!(fast.unwrap(), 2);
    assert_eq!(slow.unwrap(), 7);
    assert_eq!(fast_calls.load(Ordering::SeqCst), 2);
    assert_eq!(slow_calls.load(Ordering::SeqCst), 7);
}

#[tokio::test(start_paused = true)]
async fn test_zero_attempts_still_fetches_once() {
    let calls = AtomicU32::new(0);

    let result = poll_until_terminal(policy(0), &CancellationToken::new(), || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, AppError>(AnalysisState::<u32>::Pending) }
    })
    .await;

    assert!(matches!(result, Err(PollError::TimedOut { attempts: 1 })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Property Tests
// ============================================================================

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A job that needs `waiting` unfinished checks completes iff the budget
    /// allows `waiting + 1` fetches, and never fetches more than the budget.
    #[test]
    fn prop_fetch_count_matches_budget(waiting in 0u32..20, max_attempts in 1u32..25) {
        let runtime = paused_runtime();
        let (result, calls, elapsed) = runtime.block_on(async {
            let calls = AtomicU32::new(0);
            let start = Instant::now();
            let result = poll_until_terminal(policy(max_attempts), &CancellationToken::new(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok::<_, AppError>(job_state(n, waiting)) }
            })
            .await;
            (result, calls.load(Ordering::SeqCst), start.elapsed())
        });

        if waiting < max_attempts {
            prop_assert_eq!(result.unwrap(), waiting + 1);
            prop_assert_eq!(calls, waiting + 1);
            prop_assert_eq!(elapsed, INTERVAL * waiting);
        } else {
            prop_assert!(
                matches!(result, Err(PollError::TimedOut { attempts }) if attempts == max_attempts),
                "expected timeout"
            );
            prop_assert_eq!(calls, max_attempts);
            prop_assert_eq!(elapsed, INTERVAL * (max_attempts - 1));
        }
    }

    /// Failure on fetch k stops the poll at exactly k fetches
    #[test]
    fn prop_failure_stops_polling(fail_at in 1u32..20) {
        let runtime = paused_runtime();
        let (result, calls) = runtime.block_on(async {
            let calls = AtomicU32::new(0);
            let result = poll_until_terminal(policy(30), &CancellationToken::new(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok::<_, AppError>(if n < fail_at {
                        AnalysisState::<u32>::Processing
                    } else {
                        AnalysisState::Failed { error: format!("failed at {}", n) }
                    })
                }
            })
            .await;
            (result, calls.load(Ordering::SeqCst))
        });

        prop_assert_eq!(calls, fail_at);
        match result {
            Err(PollError::Failed(message)) => prop_assert_eq!(message, format!("failed at {}", fail_at)),
            other => prop_assert!(false, "expected failure, got {:?}", other),
        }
    }
}
