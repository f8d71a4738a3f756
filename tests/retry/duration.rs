use crate::support::{world, AppError, Calls};
use palisade::{FaultPolicy, RetryRules, SiteKey};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn no_attempt_begins_after_the_budget_is_spent() {
    let world = world();
    // Unlimited retries; the duration budget is the only bound.
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(
            RetryRules::new()
                .max_retries(-1)
                .delay(Duration::from_millis(250))
                .jitter(Duration::ZERO)
                .max_duration(Duration::from_secs(1)),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(SiteKey::new("retry.Target", "budget()"), policy, move |_| {
            counted.bump();
            async { Err::<(), _>(AppError::Transient) }
        })
        .unwrap();

    let _ = guarded.call(()).await;
    // Attempts at 0ms, 250ms, 500ms, 750ms; the budget bars a fifth at 1s.
    assert_eq!(calls.get(), 4);
}

#[tokio::test(start_paused = true)]
async fn duration_budget_takes_precedence_over_remaining_retries() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(
            RetryRules::new()
                .max_retries(1000)
                .delay(Duration::from_millis(400))
                .jitter(Duration::ZERO)
                .max_duration(Duration::from_secs(1)),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(
            SiteKey::new("retry.Target", "precedence()"),
            policy,
            move |_| {
                counted.bump();
                async { Err::<(), _>(AppError::Transient) }
            },
        )
        .unwrap();

    let _ = guarded.call(()).await;
    // Far fewer than 1001 attempts: the wall clock stopped the loop.
    assert!(calls.get() <= 4, "got {} attempts", calls.get());
}

#[tokio::test]
async fn delay_exceeding_budget_is_a_definition_error() {
    let result = FaultPolicy::<(), (), AppError>::builder()
        .retry(
            RetryRules::new()
                .delay(Duration::from_secs(10))
                .max_duration(Duration::from_secs(1)),
        )
        .build();
    assert!(matches!(
        result.err(),
        Some(palisade::DefinitionError::DelayExceedsMaxDuration { .. })
    ));
}
