use crate::support::{world, AppError, Calls};
use palisade::{CircuitBreakerRules, CircuitState, FaultPolicy, SiteKey};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn opens_on_the_sample_that_reaches_the_ratio() {
    let world = world();
    let policy = FaultPolicy::<u32, u32, AppError>::builder()
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(4)
                .failure_ratio(0.5)
                .delay(Duration::from_secs(60)),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let site = SiteKey::new("breaker.Target", "halfFailing(u32)");
    let guarded = world
        .engine
        .guard(site.clone(), policy, move |n: u32| {
            counted.bump();
            async move {
                // Outcomes [F, F, S, S]: ratio hits 0.5 on the 4th sample.
                if n < 2 {
                    Err(AppError::Transient)
                } else {
                    Ok(n)
                }
            }
        })
        .unwrap();

    for n in 0..4 {
        let _ = guarded.call(n).await;
    }
    let circuit = world.engine.circuit(&site).expect("circuit registered");
    assert_eq!(circuit.state(), CircuitState::Open);

    // The 5th call fails fast without invoking the target.
    let outcome = guarded.call(4).await;
    assert!(outcome.unwrap_err().is_circuit_open());
    assert_eq!(calls.get(), 4);
}

#[tokio::test]
async fn never_evaluates_before_the_window_fills() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(10)
                .failure_ratio(0.1),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let site = SiteKey::new("breaker.Target", "fewSamples()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, move |_| async {
            Err::<(), _>(AppError::Transient)
        })
        .unwrap();

    for _ in 0..9 {
        let _ = guarded.call(()).await;
    }
    let circuit = world.engine.circuit(&site).unwrap();
    assert_eq!(
        circuit.state(),
        CircuitState::Closed,
        "9 samples < threshold 10"
    );

    let _ = guarded.call(()).await;
    assert_eq!(circuit.state(), CircuitState::Open);
}

#[tokio::test]
async fn skip_on_categories_do_not_count_as_failures() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(4)
                .failure_ratio(0.5)
                .fail_on(&[palisade::Taxonomy::FAULT])
                .skip_on(&[world.transient]),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let site = SiteKey::new("breaker.Target", "skipped()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, move |_| async {
            Err::<(), _>(AppError::Transient)
        })
        .unwrap();

    for _ in 0..12 {
        let _ = guarded.call(()).await;
    }
    let circuit = world.engine.circuit(&site).unwrap();
    assert_eq!(circuit.state(), CircuitState::Closed);
}

#[tokio::test]
async fn each_physical_retry_attempt_records_one_sample() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(palisade::RetryRules::new().max_retries(3))
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(4)
                .failure_ratio(1.0)
                .delay(Duration::from_secs(60)),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let site = SiteKey::new("breaker.Target", "retriedInto()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, move |_| async {
            Err::<(), _>(AppError::Transient)
        })
        .unwrap();

    // One logical call = 4 physical attempts = a full window of failures.
    let _ = guarded.call(()).await;
    let circuit = world.engine.circuit(&site).unwrap();
    assert_eq!(circuit.state(), CircuitState::Open);
    assert_eq!(circuit.metrics().failure_count, 4);
}

#[tokio::test]
async fn concurrent_callers_record_in_completion_order_without_loss() {
    let world = world();
    let policy = FaultPolicy::<u32, u32, AppError>::builder()
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(64)
                .failure_ratio(1.0),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let successes = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&successes);
    let site = SiteKey::new("breaker.Target", "concurrent(u32)");
    let guarded = world
        .engine
        .guard(site.clone(), policy, move |n: u32| {
            let s = Arc::clone(&s);
            async move {
                tokio::time::sleep(Duration::from_millis(u64::from(n % 5))).await;
                s.fetch_add(1, Ordering::SeqCst);
                Ok(n)
            }
        })
        .unwrap();

    let mut tasks = Vec::new();
    for n in 0..64u32 {
        let guarded = guarded.clone();
        tasks.push(tokio::spawn(async move { guarded.call(n).await }));
    }
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    let circuit = world.engine.circuit(&site).unwrap();
    let metrics = circuit.metrics();
    assert_eq!(metrics.samples, 64);
    assert_eq!(metrics.failure_count, 0);
    assert_eq!(circuit.state(), CircuitState::Closed);
}
