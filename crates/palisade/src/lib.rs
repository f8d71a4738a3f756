//! Fault-tolerance execution engine.
//!
//! palisade guards calls to fallible operations with composable resilience
//! policies (retry with jittered backoff, circuit breaking, concurrency
//! bulkheads, deadlines, and fallbacks) behind one fixed interceptor
//! order per call site:
//!
//! ```text
//! caller → fallback → retry → circuit breaker → bulkhead → timeout → target
//! ```
//!
//! Each layer may short-circuit without invoking the layers inside it, and
//! retry re-invocations re-enter at the circuit-breaker gate, so every
//! physical attempt is gated, admitted, and recorded individually.
//! Synchronous and asynchronous invocation modes behave identically; the
//! asynchronous mode adds only a task boundary and a cancellation handle.
//!
//! # Example
//!
//! ```rust
//! use palisade::{
//!     BulkheadRules, CircuitBreakerRules, Engine, FallbackRules, FaultPolicy, RetryRules,
//!     SiteKey,
//! };
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone)]
//! struct LookupError;
//!
//! # async fn example() -> Result<(), palisade::DefinitionError> {
//! let engine = Engine::new();
//!
//! let policy = FaultPolicy::<String, String, LookupError>::builder()
//!     .retry(RetryRules::new().max_retries(2).delay(Duration::from_millis(50)))
//!     .circuit_breaker(CircuitBreakerRules::new().request_volume_threshold(10))
//!     .bulkhead(BulkheadRules::new().capacity(16))
//!     .timeout(Duration::from_secs(2))
//!     .fallback(FallbackRules::method(|key: String| async move {
//!         Ok(format!("cached: {}", key))
//!     }))
//!     .build()?;
//!
//! let lookup = engine.guard(
//!     SiteKey::new("catalog.Client", "lookup(String)"),
//!     policy,
//!     |key: String| async move { Ok::<_, LookupError>(format!("live: {}", key)) },
//! )?;
//!
//! // Synchronous mode: await the outcome in place.
//! let value = lookup.call("widget".to_string()).await;
//!
//! // Asynchronous mode: a cancellable handle.
//! let pending = lookup.spawn("widget".to_string());
//! let value = pending.await;
//! # Ok(())
//! # }
//! ```
//!
//! # Failure categories
//!
//! Policies decide what to retry, what trips the circuit, and what the
//! fallback covers by failure *category*: tags in a subtype hierarchy
//! built once per process (see [`palisade_core::taxonomy`]). The engine
//! classifies synthetic failures (timeouts, open circuits, full bulkheads)
//! to built-in categories; application errors go through the policy's
//! classifier. Caller-initiated cancellation is deliberately outside the
//! fault hierarchy, so category-driven recovery never fires for it.
//!
//! # Shared state
//!
//! Circuit breakers and bulkheads are keyed by [`SiteKey`] in a
//! process-wide registry: every chain guarding the same resolved call site
//! shares one breaker and one limiter, however many instances of the
//! owning component exist. The shared handles double as the
//! administrative surface ([`Engine::circuit`], [`Engine::bulkhead`],
//! [`Engine::reset`]).

pub use bridge::AsyncExecution;
pub use engine::{Engine, GuardedCall};
pub use invocation::Invocation;
pub use policy::{
    BulkheadRules, CircuitBreakerRules, FallbackRules, FaultPolicy, FaultPolicyBuilder, RetryRules,
};
pub use site::SiteKey;

pub use palisade_core::taxonomy::{Category, CategorySet, Taxonomy, TaxonomyBuilder};
pub use palisade_core::{DefinitionError, FaultError};

pub use palisade_bulkhead::{BulkheadHandle, BulkheadMode};
pub use palisade_circuitbreaker::{CircuitHandle, CircuitMetrics, CircuitState};
pub use palisade_fallback::{FallbackContext, FallbackHandler};

mod bridge;
mod engine;
mod invocation;
mod policy;
mod site;
