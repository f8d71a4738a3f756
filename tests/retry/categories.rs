use crate::support::{app_error, world, AppError, Calls};
use palisade::{FaultPolicy, RetryRules, SiteKey, Taxonomy};

#[tokio::test]
async fn abort_category_wins_over_retry_category_on_overlap() {
    let world = world();
    // retry_on covers everything; abort_on names the narrower category.
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(
            RetryRules::new()
                .max_retries(5)
                .retry_on(&[Taxonomy::FAULT])
                .abort_on(&[world.fatal]),
        )
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(SiteKey::new("retry.Target", "fatal()"), policy, move |_| {
            counted.bump();
            async { Err::<(), _>(AppError::Fatal) }
        })
        .unwrap();

    let outcome = guarded.call(()).await;
    assert_eq!(app_error(outcome), AppError::Fatal);
    assert_eq!(calls.get(), 1, "abort categories are never retried");
}

#[tokio::test]
async fn category_outside_retry_on_is_not_retried() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(RetryRules::new().max_retries(5).retry_on(&[world.transient]))
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(
            SiteKey::new("retry.Target", "offCategory()"),
            policy,
            move |_| {
                counted.bump();
                async { Err::<(), _>(AppError::Fatal) }
            },
        )
        .unwrap();

    let _ = guarded.call(()).await;
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn matching_category_is_retried() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(RetryRules::new().max_retries(2).retry_on(&[world.transient]))
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = world
        .engine
        .guard(
            SiteKey::new("retry.Target", "onCategory()"),
            policy,
            move |_| {
                counted.bump();
                async { Err::<(), _>(AppError::Transient) }
            },
        )
        .unwrap();

    let _ = guarded.call(()).await;
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn subtype_categories_inherit_retryability() {
    // A child of "transient" retries under retry_on = [transient].
    let mut builder = Taxonomy::builder();
    let transient = builder.add("transient", &[Taxonomy::FAULT]);
    let flaky_io = builder.add("flaky-io", &[transient]);
    let engine = palisade::Engine::with_taxonomy(builder.build());

    let policy = FaultPolicy::<(), (), AppError>::builder()
        .retry(RetryRules::new().max_retries(2).retry_on(&[transient]))
        .classify(move |_| flaky_io)
        .build()
        .unwrap();

    let calls = Calls::new();
    let counted = calls.clone();
    let guarded = engine
        .guard(SiteKey::new("retry.Target", "subtype()"), policy, move |_| {
            counted.bump();
            async { Err::<(), _>(AppError::Transient) }
        })
        .unwrap();

    let _ = guarded.call(()).await;
    assert_eq!(calls.get(), 3);
}
