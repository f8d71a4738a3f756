use crate::support::{app_error, world, AppError, Calls};
use palisade::{FaultPolicy, RetryRules, SiteKey};
use std::time::Duration;

#[tokio::test]
async fn failing_target_is_invoked_max_retries_plus_one_times() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(RetryRules::new().max_retries(3))
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(SiteKey::new("retry.Target", "alwaysFails()"), policy, move |_| {
            counted.bump();
            async { Err::<(), _>(AppError::Transient) }
        })
        .unwrap();

    let outcome = guarded.call(()).await;
    assert_eq!(app_error(outcome), AppError::Transient);
    assert_eq!(calls.get(), 4);
}

#[tokio::test]
async fn three_failures_then_exhaustion_propagates_the_last_failure() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(RetryRules::new().max_retries(2))
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(
            SiteKey::new("retry.Target", "failsThrice()"),
            policy,
            move |_| {
                let n = counted.bump();
                async move {
                    // Distinguishable failures; only the last may surface.
                    if n < 2 {
                        Err::<(), _>(AppError::Transient)
                    } else {
                        Err(AppError::Fatal)
                    }
                }
            },
        )
        .unwrap();

    let outcome = guarded.call(()).await;
    assert_eq!(calls.get(), 3);
    assert_eq!(app_error(outcome), AppError::Fatal);
}

#[tokio::test]
async fn success_mid_loop_returns_immediately() {
    let world = world();
    let policy = FaultPolicy::<(), u32, AppError>::builder()
        .retry(RetryRules::new().max_retries(10))
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(
            SiteKey::new("retry.Target", "eventuallySucceeds()"),
            policy,
            move |_| {
                let n = counted.bump();
                async move {
                    if n < 2 {
                        Err(AppError::Transient)
                    } else {
                        Ok(n as u32)
                    }
                }
            },
        )
        .unwrap();

    assert_eq!(guarded.call(()).await.unwrap(), 2);
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn zero_retries_make_a_single_attempt() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(RetryRules::new().max_retries(0))
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(SiteKey::new("retry.Target", "once()"), policy, move |_| {
            counted.bump();
            async { Err::<(), _>(AppError::Transient) }
        })
        .unwrap();

    let _ = guarded.call(()).await;
    assert_eq!(calls.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn delay_is_waited_between_attempts() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(
            RetryRules::new()
                .max_retries(2)
                .delay(Duration::from_millis(500))
                .jitter(Duration::ZERO),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(SiteKey::new("retry.Target", "delayed()"), policy, move |_| {
            counted.bump();
            async { Err::<(), _>(AppError::Transient) }
        })
        .unwrap();

    let started = tokio::time::Instant::now();
    let _ = guarded.call(()).await;
    assert_eq!(calls.get(), 3);
    // Two inter-attempt waits of 500ms under the paused clock.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1100), "{:?}", elapsed);
}
