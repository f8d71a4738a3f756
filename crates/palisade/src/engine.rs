//! Chain composition and the engine facade.

use crate::bridge::AsyncExecution;
use crate::invocation::{Invocation, TargetService};
use crate::policy::{FallbackKind, FaultPolicy};
use crate::site::{SiteKey, SiteRegistry};
use futures::future::BoxFuture;
use palisade_bulkhead::{BulkheadConfigBuilder, BulkheadHandle, BulkheadLayer};
use palisade_circuitbreaker::{
    CircuitBreakerConfig, CircuitBreakerLayer, CircuitHandle, FailurePolicy,
};
use palisade_core::taxonomy::{Category, Taxonomy};
use palisade_core::{DefinitionError, FaultError};
use palisade_fallback::{FallbackConfig, FallbackContext, FallbackHandler, FallbackLayer};
use palisade_retry::{RetryConfig, RetryLayer};
use palisade_timeout::TimeoutLayer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::util::BoxCloneSyncService;
use tower::{Layer, ServiceExt};

/// The fault-tolerance execution engine.
///
/// Owns the failure-category taxonomy and the per-call-site registry of
/// shared circuit-breaker and bulkhead state. Chains built through
/// [`Engine::guard`] for the same [`SiteKey`] share that state; chains for
/// different keys are fully independent.
pub struct Engine {
    taxonomy: Arc<Taxonomy>,
    registry: SiteRegistry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with only the built-in failure categories.
    pub fn new() -> Self {
        Self::with_taxonomy(Taxonomy::builtin())
    }

    /// An engine with an application-defined failure taxonomy.
    pub fn with_taxonomy(taxonomy: Taxonomy) -> Self {
        Self {
            taxonomy: Arc::new(taxonomy),
            registry: SiteRegistry::default(),
        }
    }

    /// The engine's failure taxonomy.
    pub fn taxonomy(&self) -> &Arc<Taxonomy> {
        &self.taxonomy
    }

    /// Builds the guarded chain for one call site.
    ///
    /// The chain nests `fallback ⊃ retry ⊃ circuit breaker ⊃ bulkhead ⊃
    /// timeout ⊃ target` exactly once; sections absent from the policy are
    /// pass-throughs, so composition order is uniform regardless of what
    /// is configured. Retry re-invocations re-enter at the circuit-breaker
    /// gate, never at the fallback or retry layers themselves.
    ///
    /// Fails eagerly with a [`DefinitionError`] on any misconfiguration;
    /// nothing is registered for the site in that case.
    pub fn guard<A, R, E, F, Fut>(
        &self,
        site: SiteKey,
        policy: FaultPolicy<A, R, E>,
        target: F,
    ) -> Result<GuardedCall<A, R, E>, DefinitionError>
    where
        A: Clone + Send + Sync + 'static,
        R: Send + 'static,
        E: Send + Sync + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<R, E>> + Send + 'static,
    {
        let name = site.to_string();
        let taxonomy = Arc::clone(&self.taxonomy);

        let app_classifier = Arc::clone(&policy.classifier);
        let classify: Arc<dyn Fn(&FaultError<E>) -> Category + Send + Sync> =
            Arc::new(move |error| match error {
                FaultError::Application(e) => (app_classifier)(e),
                FaultError::Timeout { .. } => Taxonomy::TIMEOUT,
                FaultError::CircuitOpen => Taxonomy::CIRCUIT_OPEN,
                FaultError::BulkheadFull { .. } => Taxonomy::BULKHEAD_FULL,
                FaultError::Cancelled => Taxonomy::CANCELLED,
            });

        let timeout_layer = match policy.timeout {
            Some(duration) => TimeoutLayer::builder()
                .duration(duration)
                .name(name.clone())
                .build(),
            None => TimeoutLayer::disabled(),
        };

        let bulkhead_layer = match &policy.bulkhead {
            Some(rules) => {
                if rules.capacity == 0 {
                    return Err(DefinitionError::ZeroBulkheadCapacity);
                }
                let rules = rules.clone();
                let state = self.registry.state(&site);
                let bulkhead_name = name.clone();
                let handle = state.bulkhead_or_init(move || {
                    Ok(BulkheadConfigBuilder::<Invocation<A>>::new()
                        .capacity(rules.capacity)
                        .mode(rules.mode)
                        .name(bulkhead_name)
                        .build_handle())
                })?;
                BulkheadLayer::with_handle(
                    handle,
                    Some(Arc::new(|invocation: &Invocation<A>| {
                        invocation.cancel.clone()
                    })),
                )
            }
            None => BulkheadLayer::disabled(),
        };

        let breaker_layer = match &policy.circuit_breaker {
            Some(rules) => {
                let state = self.registry.state(&site);
                let breaker_rules = rules.clone();
                let breaker_name = name.clone();
                let handle = state.circuit_or_init(move || {
                    CircuitBreakerConfig::builder()
                        .request_volume_threshold(breaker_rules.request_volume_threshold)
                        .failure_ratio(breaker_rules.failure_ratio)
                        .delay(breaker_rules.delay)
                        .success_threshold(breaker_rules.success_threshold)
                        .name(breaker_name)
                        .build()
                })?;
                let failure_policy =
                    FailurePolicy::new(Arc::clone(&taxonomy), Arc::clone(&classify))?
                        .fail_on(&rules.fail_on)?
                        .skip_on(&rules.skip_on)?;
                CircuitBreakerLayer::with_handle(handle, failure_policy)
            }
            None => CircuitBreakerLayer::disabled(),
        };

        let retry_layer = match &policy.retry {
            Some(rules) => {
                let mut builder =
                    RetryConfig::builder(Arc::clone(&taxonomy), Arc::clone(&classify))
                        .max_retries(rules.max_retries)
                        .delay(rules.delay)
                        .jitter(rules.jitter)
                        .jitter_factor(rules.jitter_factor)
                        .retry_on(&rules.retry_on)
                        .abort_on(&rules.abort_on)
                        .cancellation(|invocation: &Invocation<A>| invocation.cancel.clone())
                        .name(name.clone());
                if let Some(max_duration) = rules.max_duration {
                    builder = builder.max_duration(max_duration);
                }
                builder.build()?
            }
            None => RetryLayer::disabled(),
        };

        let fallback_layer = match policy.fallback {
            Some(rules) => {
                let builder =
                    FallbackConfig::builder(Arc::clone(&taxonomy), Arc::clone(&classify));
                let builder = match rules.kind {
                    FallbackKind::Handler(handler) => builder.handler(HandlerAdapter { handler }),
                    FallbackKind::Method(f) => builder.method(move |invocation: Invocation<A>| {
                        let fut = f(invocation.args);
                        async move { fut.await.map_err(FaultError::Application) }
                    }),
                    FallbackKind::MethodNoArgs(f) => builder.method_no_args(move || {
                        let fut = f();
                        async move { fut.await.map_err(FaultError::Application) }
                    }),
                };
                builder
                    .apply_on(&rules.apply_on)
                    .skip_on(&rules.skip_on)
                    .name(name.clone())
                    .build()?
            }
            None => FallbackLayer::disabled(),
        };

        let target: crate::invocation::TargetFn<A, R, E> =
            Arc::new(move |args| Box::pin(target(args)));
        let service = TargetService::new(target);
        let service = timeout_layer.layer(service);
        let service = bulkhead_layer.layer(service);
        let service = breaker_layer.layer(service);
        let service = retry_layer.layer(service);
        let service = fallback_layer.layer(service);

        Ok(GuardedCall {
            site,
            chain: BoxCloneSyncService::new(service),
        })
    }

    /// The shared circuit for a call site, if one has been built.
    pub fn circuit(&self, site: &SiteKey) -> Option<CircuitHandle> {
        self.registry.get(site).and_then(|state| state.circuit())
    }

    /// The shared bulkhead for a call site, if one has been built.
    pub fn bulkhead(&self, site: &SiteKey) -> Option<BulkheadHandle> {
        self.registry.get(site).and_then(|state| state.bulkhead())
    }

    /// Administrative reset of a site's circuit to the closed state.
    pub fn reset(&self, site: &SiteKey) {
        if let Some(circuit) = self.circuit(site) {
            circuit.reset();
        }
    }
}

// Adapts an application-level fallback handler to the chain's envelope.
struct HandlerAdapter<A, R, E> {
    handler: Arc<dyn FallbackHandler<A, R, FaultError<E>>>,
}

impl<A, R, E> FallbackHandler<Invocation<A>, R, FaultError<E>> for HandlerAdapter<A, R, E>
where
    A: Send + 'static,
    R: Send + 'static,
    E: Send + Sync + 'static,
{
    fn handle(
        &self,
        context: FallbackContext<Invocation<A>, FaultError<E>>,
    ) -> BoxFuture<'static, Result<R, FaultError<E>>> {
        self.handler.handle(FallbackContext {
            args: context.args.args,
            site: context.site,
            cause: context.cause,
        })
    }
}

/// The composed chain for one call site.
///
/// Exposes the two invocation modes: [`call`](GuardedCall::call) awaits
/// the outcome in place, [`spawn`](GuardedCall::spawn) runs the whole
/// chain on its own task and returns a cancellable handle. Both surface
/// the same terminal outcomes.
pub struct GuardedCall<A, R, E> {
    site: SiteKey,
    chain: BoxCloneSyncService<Invocation<A>, R, FaultError<E>>,
}

impl<A, R, E> Clone for GuardedCall<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            site: self.site.clone(),
            chain: self.chain.clone(),
        }
    }
}

impl<A, R, E> GuardedCall<A, R, E>
where
    A: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    /// The call site this chain was built for.
    pub fn site(&self) -> &SiteKey {
        &self.site
    }

    /// Synchronous invocation mode: runs the chain and awaits the outcome.
    pub async fn call(&self, args: A) -> Result<R, FaultError<E>> {
        let invocation = Invocation {
            args,
            cancel: CancellationToken::new(),
        };
        self.chain.clone().oneshot(invocation).await
    }

    /// Asynchronous invocation mode: runs the chain on its own task and
    /// returns a handle that completes with the same outcome.
    pub fn spawn(&self, args: A) -> AsyncExecution<R, E> {
        let cancel = CancellationToken::new();
        let invocation = Invocation {
            args,
            cancel: cancel.clone(),
        };
        let chain = self.chain.clone();
        let handle = tokio::spawn(chain.oneshot(invocation));
        AsyncExecution::new(handle, cancel)
    }
}
