//! The resolved policy for one call site.
//!
//! A [`FaultPolicy`] is the immutable, fully-resolved set of resilience
//! parameters the engine composes a chain from. Sections left out are
//! structural no-ops in the chain. All definition-time validation happens
//! in [`FaultPolicyBuilder::build`]; a policy that builds is safe to hand
//! to [`Engine::guard`](crate::Engine::guard).

use crate::FallbackHandler;
use futures::future::BoxFuture;
use palisade_bulkhead::BulkheadMode;
use palisade_core::taxonomy::{Category, Taxonomy};
use palisade_core::{DefinitionError, FaultError};
use std::sync::Arc;
use std::time::Duration;

/// Retry section of a policy.
#[derive(Clone)]
pub struct RetryRules {
    pub(crate) max_retries: i64,
    pub(crate) delay: Duration,
    pub(crate) max_duration: Option<Duration>,
    pub(crate) jitter: Duration,
    pub(crate) jitter_factor: f64,
    pub(crate) retry_on: Vec<Category>,
    pub(crate) abort_on: Vec<Category>,
}

impl Default for RetryRules {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryRules {
    /// Defaults: 3 retries, no delay, 200ms jitter window, jitter factor
    /// 0.5, retry on everything under the fault root, abort on nothing.
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::ZERO,
            max_duration: None,
            jitter: Duration::from_millis(200),
            jitter_factor: 0.5,
            retry_on: vec![Taxonomy::FAULT],
            abort_on: Vec::new(),
        }
    }

    /// Maximum retries after the initial attempt; `-1` = unlimited.
    pub fn max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay between attempts.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Overall wall-time budget measured from the first attempt.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Jitter window applied around the delay.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Jitter factor; the effective bound is `min(jitter, delay * factor)`.
    pub fn jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }

    /// Categories that are retried.
    pub fn retry_on(mut self, categories: &[Category]) -> Self {
        self.retry_on = categories.to_vec();
        self
    }

    /// Categories that abort immediately; wins over `retry_on`.
    pub fn abort_on(mut self, categories: &[Category]) -> Self {
        self.abort_on = categories.to_vec();
        self
    }
}

/// Circuit-breaker section of a policy.
#[derive(Clone)]
pub struct CircuitBreakerRules {
    pub(crate) fail_on: Vec<Category>,
    pub(crate) skip_on: Vec<Category>,
    pub(crate) request_volume_threshold: usize,
    pub(crate) failure_ratio: f64,
    pub(crate) delay: Duration,
    pub(crate) success_threshold: usize,
}

impl Default for CircuitBreakerRules {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerRules {
    /// Defaults: 20-sample window, 0.5 failure ratio, 5 second open delay,
    /// 1 trial success to close, fail on everything under the fault root.
    pub fn new() -> Self {
        Self {
            fail_on: vec![Taxonomy::FAULT],
            skip_on: Vec::new(),
            request_volume_threshold: 20,
            failure_ratio: 0.5,
            delay: Duration::from_secs(5),
            success_threshold: 1,
        }
    }

    /// Categories recorded as failures.
    pub fn fail_on(mut self, categories: &[Category]) -> Self {
        self.fail_on = categories.to_vec();
        self
    }

    /// Categories recorded as successes even when they match `fail_on`.
    pub fn skip_on(mut self, categories: &[Category]) -> Self {
        self.skip_on = categories.to_vec();
        self
    }

    /// Samples the rolling window holds before the ratio is evaluated.
    pub fn request_volume_threshold(mut self, threshold: usize) -> Self {
        self.request_volume_threshold = threshold;
        self
    }

    /// Failure fraction at which the circuit opens.
    pub fn failure_ratio(mut self, ratio: f64) -> Self {
        self.failure_ratio = ratio;
        self
    }

    /// How long the circuit stays open before probing recovery.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Consecutive trial successes required to close a half-open circuit.
    pub fn success_threshold(mut self, threshold: usize) -> Self {
        self.success_threshold = threshold;
        self
    }
}

/// Bulkhead section of a policy.
#[derive(Clone)]
pub struct BulkheadRules {
    pub(crate) capacity: usize,
    pub(crate) mode: BulkheadMode,
}

impl Default for BulkheadRules {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkheadRules {
    /// Defaults: capacity 10, fail-fast semaphore mode.
    pub fn new() -> Self {
        Self {
            capacity: 10,
            mode: BulkheadMode::Semaphore,
        }
    }

    /// Maximum concurrent executions.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Parks up to `wait_queue_size` invocations instead of failing fast.
    pub fn queued(mut self, wait_queue_size: usize) -> Self {
        self.mode = BulkheadMode::Queued { wait_queue_size };
        self
    }
}

pub(crate) enum FallbackKind<A, R, E> {
    Handler(Arc<dyn FallbackHandler<A, R, FaultError<E>>>),
    Method(Arc<dyn Fn(A) -> BoxFuture<'static, Result<R, E>> + Send + Sync>),
    MethodNoArgs(Arc<dyn Fn() -> BoxFuture<'static, Result<R, E>> + Send + Sync>),
}

/// Fallback section of a policy.
///
/// The three mechanisms are mutually exclusive by construction: a rules
/// value holds exactly one. Signature compatibility with the guarded
/// operation is discharged by the type parameters at definition time.
pub struct FallbackRules<A, R, E> {
    pub(crate) kind: FallbackKind<A, R, E>,
    pub(crate) apply_on: Vec<Category>,
    pub(crate) skip_on: Vec<Category>,
}

impl<A, R, E> FallbackRules<A, R, E> {
    /// A capability-typed handler receiving the full invocation context.
    pub fn handler<H>(handler: H) -> Self
    where
        H: FallbackHandler<A, R, FaultError<E>> + 'static,
    {
        Self {
            kind: FallbackKind::Handler(Arc::new(handler)),
            apply_on: vec![Taxonomy::FAULT],
            skip_on: Vec::new(),
        }
    }

    /// A fallback method with the guarded operation's argument signature.
    pub fn method<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<R, E>> + Send + 'static,
    {
        Self {
            kind: FallbackKind::Method(Arc::new(move |args| Box::pin(f(args)))),
            apply_on: vec![Taxonomy::FAULT],
            skip_on: Vec::new(),
        }
    }

    /// A zero-argument fallback method.
    pub fn method_no_args<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<R, E>> + Send + 'static,
    {
        Self {
            kind: FallbackKind::MethodNoArgs(Arc::new(move || Box::pin(f()))),
            apply_on: vec![Taxonomy::FAULT],
            skip_on: Vec::new(),
        }
    }

    /// Categories the fallback applies to.
    pub fn apply_on(mut self, categories: &[Category]) -> Self {
        self.apply_on = categories.to_vec();
        self
    }

    /// Categories excluded from the fallback; wins over `apply_on`.
    pub fn skip_on(mut self, categories: &[Category]) -> Self {
        self.skip_on = categories.to_vec();
        self
    }
}

/// Immutable, fully-resolved resilience parameters for one call site.
pub struct FaultPolicy<A, R, E> {
    pub(crate) retry: Option<RetryRules>,
    pub(crate) circuit_breaker: Option<CircuitBreakerRules>,
    pub(crate) bulkhead: Option<BulkheadRules>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) fallback: Option<FallbackRules<A, R, E>>,
    pub(crate) classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
}

impl<A, R, E> FaultPolicy<A, R, E> {
    /// Creates a new policy builder.
    pub fn builder() -> FaultPolicyBuilder<A, R, E> {
        FaultPolicyBuilder::new()
    }
}

/// Builder for [`FaultPolicy`]; performs all definition-time validation.
pub struct FaultPolicyBuilder<A, R, E> {
    retry: Option<RetryRules>,
    circuit_breaker: Option<CircuitBreakerRules>,
    bulkhead: Option<BulkheadRules>,
    timeout: Option<Duration>,
    fallback: Option<FallbackRules<A, R, E>>,
    classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
}

impl<A, R, E> Default for FaultPolicyBuilder<A, R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R, E> FaultPolicyBuilder<A, R, E> {
    /// Creates an empty builder: every section off, application failures
    /// classified under the fault root.
    pub fn new() -> Self {
        Self {
            retry: None,
            circuit_breaker: None,
            bulkhead: None,
            timeout: None,
            fallback: None,
            classifier: Arc::new(|_| Taxonomy::FAULT),
        }
    }

    /// Enables the retry section.
    pub fn retry(mut self, rules: RetryRules) -> Self {
        self.retry = Some(rules);
        self
    }

    /// Enables the circuit-breaker section.
    pub fn circuit_breaker(mut self, rules: CircuitBreakerRules) -> Self {
        self.circuit_breaker = Some(rules);
        self
    }

    /// Enables the bulkhead section.
    pub fn bulkhead(mut self, rules: BulkheadRules) -> Self {
        self.bulkhead = Some(rules);
        self
    }

    /// Enables the timeout section.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Enables the fallback section.
    pub fn fallback(mut self, rules: FallbackRules<A, R, E>) -> Self {
        self.fallback = Some(rules);
        self
    }

    /// Sets the classifier mapping application errors to categories.
    pub fn classify<F>(mut self, f: F) -> Self
    where
        F: Fn(&E) -> Category + Send + Sync + 'static,
    {
        self.classifier = Arc::new(f);
        self
    }

    /// Validates and builds the policy.
    pub fn build(self) -> Result<FaultPolicy<A, R, E>, DefinitionError> {
        if let Some(retry) = &self.retry {
            if retry.max_retries < -1 {
                return Err(DefinitionError::InvalidMaxRetries(retry.max_retries));
            }
            if !(0.0..=1.0).contains(&retry.jitter_factor) {
                return Err(DefinitionError::JitterFactorOutOfRange(retry.jitter_factor));
            }
            if let Some(max_duration) = retry.max_duration {
                if retry.delay > max_duration {
                    return Err(DefinitionError::DelayExceedsMaxDuration {
                        delay: retry.delay,
                        max_duration,
                    });
                }
            }
        }
        if let Some(breaker) = &self.circuit_breaker {
            if breaker.request_volume_threshold == 0 {
                return Err(DefinitionError::ZeroRequestVolumeThreshold);
            }
            if breaker.success_threshold == 0 {
                return Err(DefinitionError::ZeroSuccessThreshold);
            }
            if !(0.0..=1.0).contains(&breaker.failure_ratio) {
                return Err(DefinitionError::FailureRatioOutOfRange(
                    breaker.failure_ratio,
                ));
            }
        }
        if let Some(bulkhead) = &self.bulkhead {
            if bulkhead.capacity == 0 {
                return Err(DefinitionError::ZeroBulkheadCapacity);
            }
        }

        Ok(FaultPolicy {
            retry: self.retry,
            circuit_breaker: self.circuit_breaker,
            bulkhead: self.bulkhead,
            timeout: self.timeout,
            fallback: self.fallback,
            classifier: self.classifier,
        })
    }
}
