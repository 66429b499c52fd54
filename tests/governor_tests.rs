//! Property-style tests for the request governor's pacing and concurrency
//! guarantees under randomized concurrent call patterns.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use swapdeck::engine::{GovernorConfig, RequestGovernor};
use swapdeck::error::LedgerError;
use tokio::time::{sleep, Instant};

fn config(min_interval_ms: u64, max_in_flight: usize) -> GovernorConfig {
    GovernorConfig {
        min_interval_ms,
        max_in_flight,
        max_attempts: 3,
        base_backoff_ms: 5,
        max_backoff_ms: 50,
        rate_limit_cooldown_ms: 10,
        rate_limit_retries: 3,
        request_timeout_ms: 5_000,
    }
}

/// Cheap deterministic pseudo-randomness; keeps the call pattern varied
/// without a RNG dependency.
fn scatter(seed: u64, modulus: u64) -> u64 {
    let mixed = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
    (mixed >> 33) % modulus.max(1)
}

#[tokio::test(start_paused = true)]
async fn concurrency_cap_holds_under_randomized_load() {
    let governor = Arc::new(RequestGovernor::new(config(5, 3)));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..40u64 {
        let governor = governor.clone();
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        handles.push(tokio::spawn(async move {
            // Stagger arrivals pseudo-randomly.
            sleep(Duration::from_millis(scatter(i, 37))).await;
            governor
                .enqueue(move || {
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    let hold_ms = 3 + scatter(i * 7 + 1, 20);
                    async move {
                        let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(current, Ordering::SeqCst);
                        sleep(Duration::from_millis(hold_ms)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, LedgerError>(())
                    }
                })
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn min_spacing_holds_under_randomized_load() {
    let governor = Arc::new(RequestGovernor::new(config(10, 4)));
    let stamps = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..24u64 {
        let governor = governor.clone();
        let stamps = stamps.clone();
        handles.push(tokio::spawn(async move {
            sleep(Duration::from_millis(scatter(i + 100, 53))).await;
            governor
                .enqueue(move || {
                    let stamps = stamps.clone();
                    async move {
                        stamps.lock().unwrap().push(Instant::now());
                        Ok::<_, LedgerError>(())
                    }
                })
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut stamps = stamps.lock().unwrap().clone();
    assert_eq!(stamps.len(), 24);
    stamps.sort();
    for pair in stamps.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= Duration::from_millis(10),
            "dispatches only {gap:?} apart"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn mixed_failures_still_respect_both_constraints() {
    let governor = Arc::new(RequestGovernor::new(config(5, 2)));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let stamps = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..12u64 {
        let governor = governor.clone();
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        let stamps = stamps.clone();
        handles.push(tokio::spawn(async move {
            let attempts = Arc::new(AtomicUsize::new(0));
            let result = governor
                .enqueue(move || {
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    let stamps = stamps.clone();
                    let attempts = attempts.clone();
                    async move {
                        let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(current, Ordering::SeqCst);
                        stamps.lock().unwrap().push(Instant::now());
                        sleep(Duration::from_millis(2)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);

                        // Every third caller fails once before succeeding;
                        // every fifth gets rate limited once.
                        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                        if attempt == 0 && i % 3 == 0 {
                            Err(LedgerError::Transport("flaky".into()))
                        } else if attempt == 0 && i % 5 == 0 {
                            Err(LedgerError::RateLimited { code: 429 })
                        } else {
                            Ok(i)
                        }
                    }
                })
                .await;
            assert_eq!(result.unwrap(), i);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 2);
    let mut stamps = stamps.lock().unwrap().clone();
    stamps.sort();
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(5));
    }
}
