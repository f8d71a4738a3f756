use crate::support::{world, AppError};
use palisade::{CircuitBreakerRules, CircuitState, FaultPolicy, SiteKey};
use std::time::Duration;

fn policy(world: &crate::support::World) -> FaultPolicy<(), (), AppError> {
    FaultPolicy::builder()
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(4)
                .failure_ratio(0.5)
                .delay(Duration::from_secs(60)),
        )
        .classify(world.classifier())
        .build()
        .unwrap()
}

#[tokio::test]
async fn same_site_key_shares_one_circuit_across_chains() {
    let world = world();
    let site = SiteKey::new("orders.Gateway", "submit(Order)");

    // Two separately-guarded chains for the same resolved call site, as
    // two instances of the defining component would produce.
    let first = world
        .engine
        .guard(site.clone(), policy(&world), |_| async {
            Err::<(), _>(AppError::Transient)
        })
        .unwrap();
    let second = world
        .engine
        .guard(site.clone(), policy(&world), |_| async {
            Err::<(), _>(AppError::Transient)
        })
        .unwrap();

    // Half the window through each chain.
    for _ in 0..2 {
        let _ = first.call(()).await;
    }
    for _ in 0..2 {
        let _ = second.call(()).await;
    }

    let circuit = world.engine.circuit(&site).unwrap();
    assert_eq!(circuit.state(), CircuitState::Open, "samples accumulated");

    // Both chains observe the open circuit.
    assert!(first.call(()).await.unwrap_err().is_circuit_open());
    assert!(second.call(()).await.unwrap_err().is_circuit_open());
}

#[tokio::test]
async fn different_site_keys_are_independent() {
    let world = world();
    let failing_site = SiteKey::new("orders.Gateway", "submit(Order)");
    let healthy_site = SiteKey::new("orders.Gateway", "status()");

    let failing = world
        .engine
        .guard(failing_site.clone(), policy(&world), |_| async {
            Err::<(), _>(AppError::Transient)
        })
        .unwrap();
    let healthy = world
        .engine
        .guard(healthy_site.clone(), policy(&world), |_| async { Ok(()) })
        .unwrap();

    for _ in 0..4 {
        let _ = failing.call(()).await;
    }
    assert!(world.engine.circuit(&failing_site).unwrap().is_open());
    assert_eq!(
        world.engine.circuit(&healthy_site).unwrap().state(),
        CircuitState::Closed
    );
    assert!(healthy.call(()).await.is_ok());
}

#[tokio::test]
async fn overriding_method_key_does_not_share_the_base_circuit() {
    // Override resolution happens in the key: an overriding method
    // carries its own owner, an inherited one keeps the base owner.
    let world = world();
    let base = SiteKey::new("base.Client", "fetch()");
    let overridden = SiteKey::new("special.Client", "fetch()");
    assert_ne!(base, overridden);

    let base_chain = world
        .engine
        .guard(base.clone(), policy(&world), |_| async {
            Err::<(), _>(AppError::Transient)
        })
        .unwrap();
    let _override_chain = world
        .engine
        .guard(overridden.clone(), policy(&world), |_| async { Ok(()) })
        .unwrap();

    for _ in 0..4 {
        let _ = base_chain.call(()).await;
    }
    assert!(world.engine.circuit(&base).unwrap().is_open());
    assert_eq!(
        world.engine.circuit(&overridden).unwrap().state(),
        CircuitState::Closed
    );
}
