//! A guarded lookup with the full chain: retry, circuit breaking, a
//! bulkhead, a deadline, and a cached fallback.
//!
//! Run with: cargo run --example guarded_lookup

use palisade::{
    BulkheadRules, CircuitBreakerRules, Engine, FallbackRules, FaultPolicy, RetryRules, SiteKey,
    Taxonomy,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum LookupError {
    Unavailable,
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::Unavailable => write!(f, "backend unavailable"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), palisade::DefinitionError> {
    let engine = Engine::new();

    let policy = FaultPolicy::<String, String, LookupError>::builder()
        .retry(
            RetryRules::new()
                .max_retries(3)
                .delay(Duration::from_millis(100))
                .jitter(Duration::from_millis(50)),
        )
        .circuit_breaker(
            CircuitBreakerRules::new()
                .request_volume_threshold(10)
                .failure_ratio(0.5)
                .delay(Duration::from_secs(5)),
        )
        .bulkhead(BulkheadRules::new().capacity(16))
        .timeout(Duration::from_millis(500))
        .fallback(
            FallbackRules::method(|key: String| async move { Ok(format!("stale:{}", key)) })
                .apply_on(&[Taxonomy::FAULT]),
        )
        .build()?;

    // A backend that recovers after a few failures.
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let lookup = engine.guard(
        SiteKey::new("example.Catalog", "lookup(String)"),
        policy,
        move |key: String| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LookupError::Unavailable)
                } else {
                    Ok(format!("live:{}", key))
                }
            }
        },
    )?;

    // Synchronous mode: awaited in place, retried behind the scenes.
    match lookup.call("widget".to_string()).await {
        Ok(value) => println!("lookup -> {}", value),
        Err(error) => println!("lookup failed: {}", error),
    }

    // Asynchronous mode: a cancellable handle.
    let pending = lookup.spawn("gadget".to_string());
    match pending.await {
        Ok(value) => println!("spawned lookup -> {}", value),
        Err(error) => println!("spawned lookup failed: {}", error),
    }

    let site = SiteKey::new("example.Catalog", "lookup(String)");
    if let Some(circuit) = engine.circuit(&site) {
        println!("circuit state after the run: {:?}", circuit.state());
    }

    Ok(())
}
