//! Circuit breaker middleware for guarded calls.
//!
//! A circuit breaker fails fast once the recent failure rate crosses a
//! threshold, then periodically probes recovery.
//!
//! ## States
//! - **Closed**: calls pass through; each completed attempt records one
//!   outcome sample into a rolling window.
//! - **Open**: calls are rejected immediately without invoking the inner
//!   service; after a configured delay the next admission attempt moves
//!   the circuit to half-open.
//! - **Half-open**: a limited number of trial calls probe the inner
//!   service. Enough consecutive successes close the circuit; a single
//!   failure reopens it and restarts the delay.
//!
//! The window is evaluated only once it holds a full
//! `request_volume_threshold` of samples, so a cold circuit never opens
//! off a handful of early failures.
//!
//! Whether a completed attempt counts as a failure is decided by a
//! [`FailurePolicy`]: the error is classified to a failure category and
//! tested against the configured `fail_on`/`skip_on` sets with subtype
//! semantics (skip wins on overlap).
//!
//! ```rust
//! use palisade_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerLayer, FailurePolicy};
//! use palisade_core::{taxonomy::Taxonomy, FaultError};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tower::{Layer, service_fn};
//!
//! # fn example() -> Result<(), palisade_core::DefinitionError> {
//! let handle = CircuitBreakerConfig::builder()
//!     .request_volume_threshold(10)
//!     .failure_ratio(0.5)
//!     .delay(Duration::from_secs(5))
//!     .success_threshold(2)
//!     .name("inventory")
//!     .build()?;
//!
//! let taxonomy = Arc::new(Taxonomy::builtin());
//! let policy: FailurePolicy<FaultError<String>> =
//!     FailurePolicy::new(Arc::clone(&taxonomy), Arc::new(|_| Taxonomy::FAULT))?;
//!
//! let layer = CircuitBreakerLayer::with_handle(handle.clone(), policy);
//! let svc = service_fn(|req: String| async move { Ok::<_, FaultError<String>>(req) });
//! let service = layer.layer(svc);
//!
//! // The handle stays available for inspection and administration.
//! assert!(!handle.is_open());
//! # Ok(())
//! # }
//! ```

use crate::circuit::Permission;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{
    Assessment, CircuitBreakerConfig, CircuitBreakerConfigBuilder, FailurePolicy,
};
pub use error::OpenCircuitError;
pub use events::CircuitBreakerEvent;
pub use handle::CircuitHandle;
pub use layer::CircuitBreakerLayer;

mod circuit;
mod config;
mod error;
mod events;
mod handle;
mod layer;

/// A Tower service that applies circuit breaking to an inner service.
pub struct CircuitBreaker<S, E> {
    inner: S,
    handle: Option<CircuitHandle>,
    policy: Option<Arc<FailurePolicy<E>>>,
}

impl<S, E> CircuitBreaker<S, E> {
    pub(crate) fn new(
        inner: S,
        handle: Option<CircuitHandle>,
        policy: Option<Arc<FailurePolicy<E>>>,
    ) -> Self {
        Self {
            inner,
            handle,
            policy,
        }
    }
}

impl<S: Clone, E> Clone for CircuitBreaker<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            handle: self.handle.clone(),
            policy: self.policy.clone(),
        }
    }
}

// Balances half-open trial accounting when an attempt is dropped without
// completing (e.g. the invocation future was cancelled).
struct AttemptGuard {
    handle: CircuitHandle,
    permission: Option<Permission>,
}

impl AttemptGuard {
    fn settle(&mut self) -> Option<Permission> {
        self.permission.take()
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if let Some(permission) = self.permission.take() {
            self.handle.abandon(permission);
        }
    }
}

impl<S, Req, E> Service<Req> for CircuitBreaker<S, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    E: From<OpenCircuitError> + Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut inner = self.inner.clone();
        let handle = self.handle.clone();
        let policy = self.policy.clone();

        Box::pin(async move {
            let (Some(handle), Some(policy)) = (handle, policy) else {
                return inner.call(req).await;
            };

            let Some(permission) = handle.try_acquire() else {
                return Err(OpenCircuitError.into());
            };

            let mut guard = AttemptGuard {
                handle: handle.clone(),
                permission: Some(permission),
            };

            let result = inner.call(req).await;

            if let Some(permission) = guard.settle() {
                match &result {
                    Ok(_) => handle.record(permission, false),
                    Err(error) => match policy.assess(error) {
                        Assessment::Failure => handle.record(permission, true),
                        Assessment::Success => handle.record(permission, false),
                        Assessment::Discard => handle.abandon(permission),
                    },
                }
            }

            result
        })
    }
}
