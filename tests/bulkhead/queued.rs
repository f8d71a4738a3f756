use crate::support::{world, AppError};
use palisade::{BulkheadRules, FaultPolicy, SiteKey};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test]
async fn queue_parks_up_to_its_size_then_rejects() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .bulkhead(BulkheadRules::new().capacity(1).queued(2))
        .classify(world.classifier())
        .build()
        .unwrap();

    let site = SiteKey::new("bulkhead.Target", "queued()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, |_| async {
            sleep(Duration::from_millis(80)).await;
            Ok(())
        })
        .unwrap();

    // One running, two parked.
    let mut tasks = Vec::new();
    for _ in 0..3 {
        let guarded = guarded.clone();
        tasks.push(tokio::spawn(async move { guarded.call(()).await }));
        sleep(Duration::from_millis(10)).await;
    }
    let handle = world.engine.bulkhead(&site).unwrap();
    assert_eq!(handle.in_flight(), 1);
    assert_eq!(handle.queued(), 2);

    // Slot and queue both full: immediate rejection.
    let outcome = guarded.call(()).await;
    assert!(outcome.unwrap_err().is_bulkhead_full());

    // Parked invocations are dispatched as the slot frees.
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
}

#[tokio::test]
async fn queued_invocations_dispatch_in_fifo_order() {
    let world = world();
    let policy = FaultPolicy::<u32, u32, AppError>::builder()
        .bulkhead(BulkheadRules::new().capacity(1).queued(4))
        .classify(world.classifier())
        .build()
        .unwrap();

    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = Arc::clone(&order);
    let site = SiteKey::new("bulkhead.Target", "fifo(u32)");
    let guarded = world
        .engine
        .guard(site.clone(), policy, move |n: u32| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(n);
                sleep(Duration::from_millis(20)).await;
                Ok(n)
            }
        })
        .unwrap();

    let mut tasks = Vec::new();
    for n in 0..5u32 {
        let guarded = guarded.clone();
        tasks.push(tokio::spawn(async move { guarded.call(n).await }));
        // Stagger spawns so queue order is deterministic.
        sleep(Duration::from_millis(5)).await;
    }
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn cancelled_waiter_releases_its_queue_slot() {
    let world = world();
    let policy = FaultPolicy::<(), (), AppError>::builder()
        .bulkhead(BulkheadRules::new().capacity(1).queued(1))
        .classify(world.classifier())
        .build()
        .unwrap();

    let executed = Arc::new(AtomicUsize::new(0));
    let e = Arc::clone(&executed);
    let site = SiteKey::new("bulkhead.Target", "cancelWaiter()");
    let guarded = world
        .engine
        .guard(site.clone(), policy, move |_| {
            let e = Arc::clone(&e);
            async move {
                e.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(120)).await;
                Ok(())
            }
        })
        .unwrap();

    let holder = guarded.clone();
    let holding = tokio::spawn(async move { holder.call(()).await });
    sleep(Duration::from_millis(10)).await;

    // Park one waiter asynchronously, then cancel it.
    let waiter = guarded.spawn(());
    sleep(Duration::from_millis(10)).await;
    let handle = world.engine.bulkhead(&site).unwrap();
    assert_eq!(handle.queued(), 1);

    waiter.cancel();
    let outcome = waiter.await;
    assert!(outcome.unwrap_err().is_cancelled());
    assert_eq!(handle.queued(), 0, "queue slot released on cancellation");
    assert_eq!(executed.load(Ordering::SeqCst), 1, "waiter never ran");

    assert!(holding.await.unwrap().is_ok());
}
