use crate::support::{world, AppError};
use palisade::{BulkheadRules, FaultPolicy, SiteKey};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

#[tokio::test]
async fn capacity_plus_one_concurrent_admissions_reject_the_extra() {
    let world = world();
    let capacity = 3usize;
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .bulkhead(BulkheadRules::new().capacity(capacity))
        .classify(world.classifier())
        .build()
        .unwrap();

    // Targets park until the test flips the watch channel.
    let (started, mut admitted) = mpsc::unbounded_channel::<()>();
    let (hold_tx, hold_rx) = tokio::sync::watch::channel(false);
    let site = SiteKey::new("bulkhead.Target", "blocking()");

    let guarded = world
        .engine
        .guard(site.clone(), policy, move |_| {
            let started = started.clone();
            let mut hold = hold_rx.clone();
            async move {
                let _ = started.send(());
                while !*hold.borrow() {
                    if hold.changed().await.is_err() {
                        break;
                    }
                }
                Ok(())
            }
        })
        .unwrap();

    let mut in_flight = Vec::new();
    for _ in 0..capacity {
        let guarded = guarded.clone();
        in_flight.push(tokio::spawn(async move { guarded.call(()).await }));
    }
    for _ in 0..capacity {
        admitted.recv().await.expect("target admitted");
    }

    let handle = world.engine.bulkhead(&site).unwrap();
    assert_eq!(handle.in_flight(), capacity);

    // The (capacity + 1)-th admission fails immediately.
    let outcome = guarded.call(()).await;
    assert!(outcome.unwrap_err().is_bulkhead_full());

    // Once any in-flight call completes, the next admission succeeds.
    let _ = hold_tx.send(true);
    for task in in_flight {
        assert!(task.await.unwrap().is_ok());
    }
    assert!(guarded.call(()).await.is_ok());
}

#[tokio::test]
async fn rejection_does_not_invoke_the_target() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .bulkhead(BulkheadRules::new().capacity(1))
        .classify(world.classifier())
        .build()
        .unwrap();

    let calls = crate::support::Calls::new();
    let counted = calls.clone();
    let site = SiteKey::new("bulkhead.Target", "counted()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, move |_| {
            counted.bump();
            async {
                sleep(Duration::from_millis(100)).await;
                Ok(())
            }
        })
        .unwrap();

    let holder = guarded.clone();
    let holding = tokio::spawn(async move { holder.call(()).await });
    sleep(Duration::from_millis(20)).await;

    let outcome = guarded.call(()).await;
    assert!(outcome.unwrap_err().is_bulkhead_full());
    assert_eq!(calls.get(), 1, "rejected call never reached the target");

    assert!(holding.await.unwrap().is_ok());
}

#[tokio::test]
async fn same_site_shares_one_limiter_across_chains() {
    let world = world();
    let site = SiteKey::new("bulkhead.Target", "shared()");

    let make_policy = || {
        FaultPolicy::<(), (), AppError>::builder()
            .bulkhead(BulkheadRules::new().capacity(1))
            .classify(world.classifier())
            .build()
            .unwrap()
    };
    let first = world
        .engine
        .guard(site.clone(), make_policy(), |_| async {
            sleep(Duration::from_millis(100)).await;
            Ok(())
        })
        .unwrap();
    let second = world
        .engine
        .guard(site.clone(), make_policy(), |_| async {
            sleep(Duration::from_millis(100)).await;
            Ok(())
        })
        .unwrap();

    let holding = tokio::spawn(async move { first.call(()).await });
    sleep(Duration::from_millis(20)).await;

    // The second chain admits against the same permits.
    let outcome = second.call(()).await;
    assert!(outcome.unwrap_err().is_bulkhead_full());
    assert!(holding.await.unwrap().is_ok());
}
