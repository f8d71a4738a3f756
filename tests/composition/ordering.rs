use crate::support::{world, AppError, Calls};
use palisade::{
    BulkheadRules, CircuitBreakerRules, FallbackRules, FaultPolicy, RetryRules, SiteKey,
    Taxonomy,
};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn bulkhead_rejections_are_recorded_by_the_circuit_breaker() {
    // The breaker gates outside the bulkhead, so admission refusals are
    // outcomes it records like any other failure.
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(2)
                .failure_ratio(0.5)
                .delay(Duration::from_secs(60)),
        )
        .bulkhead(BulkheadRules::new().capacity(1))
        .classify(world.classifier())
        .build()
        .unwrap();

    let site = SiteKey::new("composition.Target", "saturated()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, |_| async {
            sleep(Duration::from_millis(150)).await;
            Ok(())
        })
        .unwrap();

    let holder = guarded.clone();
    let holding = tokio::spawn(async move { holder.call(()).await });
    sleep(Duration::from_millis(20)).await;

    // Two rejected admissions fill the breaker window with failures.
    for _ in 0..2 {
        let outcome = guarded.call(()).await;
        assert!(outcome.unwrap_err().is_bulkhead_full());
    }
    assert!(world.engine.circuit(&site).unwrap().is_open());

    // The circuit now fails fast even though capacity has freed up.
    assert!(holding.await.unwrap().is_ok());
    let outcome = guarded.call(()).await;
    assert!(outcome.unwrap_err().is_circuit_open());
}

#[tokio::test]
async fn retry_reenters_at_the_circuit_breaker_gate() {
    // Once the breaker opens mid-loop, remaining retries observe the open
    // circuit instead of reaching the target.
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(RetryRules::new().max_retries(5))
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(2)
                .failure_ratio(1.0)
                .delay(Duration::from_secs(60)),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let site = SiteKey::new("composition.Target", "tripsMidLoop()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, move |_| {
            counted.bump();
            async { Err::<(), _>(AppError::Transient) }
        })
        .unwrap();

    let outcome = guarded.call(()).await;
    // Attempts 1 and 2 reach the target and trip the circuit; attempts
    // 3..6 are gated. The final failure is the open circuit.
    assert!(outcome.unwrap_err().is_circuit_open());
    assert_eq!(calls.get(), 2);
}

#[tokio::test]
async fn fallback_wraps_everything_including_the_open_circuit() {
    let world = world();
    let policy = FaultPolicy::<(), &'static str, AppError>::builder()
        .retry(RetryRules::new().max_retries(1))
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(2)
                .failure_ratio(1.0)
                .delay(Duration::from_secs(60)),
        )
        .fallback(FallbackRules::method_no_args(|| async { Ok("degraded") }))
        .classify(world.classifier())
        .build()
        .unwrap();

    let site = SiteKey::new("composition.Target", "degrades()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, |_| async {
            Err::<&'static str, _>(AppError::Transient)
        })
        .unwrap();

    // The loop trips the breaker; the fallback still catches the
    // terminal failure, whatever its category.
    assert_eq!(guarded.call(()).await.unwrap(), "degraded");
    assert!(world.engine.circuit(&site).unwrap().is_open());
    assert_eq!(guarded.call(()).await.unwrap(), "degraded");
}

#[tokio::test]
async fn timeout_failures_feed_retry_inside_the_loop() {
    let world = world();
    let policy = FaultPolicy::<(), &'static str, AppError>::builder()
        .retry(RetryRules::new().max_retries(2).retry_on(&[Taxonomy::TIMEOUT]))
        .timeout(Duration::from_millis(25))
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(
            SiteKey::new("composition.Target", "slowThenFast()"),
            policy,
            move |_| {
                let n = counted.bump();
                async move {
                    if n < 2 {
                        sleep(Duration::from_millis(100)).await;
                    }
                    Ok("made it")
                }
            },
        )
        .unwrap();

    // Two timed-out attempts, then a fast one.
    assert_eq!(guarded.call(()).await.unwrap(), "made it");
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn timed_out_attempt_releases_its_bulkhead_slot() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .bulkhead(BulkheadRules::new().capacity(1))
        .timeout(Duration::from_millis(20))
        .classify(world.classifier())
        .build()
        .unwrap();

    let site = SiteKey::new("composition.Target", "slotRelease()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, |_| async {
            sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .unwrap();

    let outcome = guarded.call(()).await;
    assert!(outcome.unwrap_err().is_timeout());

    let handle = world.engine.bulkhead(&site).unwrap();
    assert_eq!(handle.in_flight(), 0, "permit released on the timeout path");
}
