//! Configuration for the retry middleware.

use crate::events::RetryEvent;
use palisade_core::taxonomy::{Category, CategorySet, Taxonomy};
use palisade_core::{DefinitionError, EventListeners, FnListener};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Extracts the cancellation token observed between attempts and during
/// inter-attempt sleeps.
pub type CancelFn<Req> = Arc<dyn Fn(&Req) -> CancellationToken + Send + Sync>;

/// Configuration for the retry loop.
pub struct RetryConfig<Req, E> {
    // None = unlimited; the duration budget is then the only bound.
    pub(crate) max_retries: Option<u64>,
    pub(crate) delay: Duration,
    pub(crate) max_duration: Option<Duration>,
    pub(crate) jitter: Duration,
    pub(crate) jitter_factor: f64,
    pub(crate) classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    pub(crate) taxonomy: Arc<Taxonomy>,
    pub(crate) retry_on: CategorySet,
    pub(crate) abort_on: CategorySet,
    pub(crate) cancel_fn: Option<CancelFn<Req>>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl<Req, E> RetryConfig<Req, E> {
    /// Creates a new configuration builder.
    ///
    /// The classifier maps an observed failure to its category; the
    /// taxonomy provides the subtype relation the `retry_on`/`abort_on`
    /// sets are matched under.
    pub fn builder(
        taxonomy: Arc<Taxonomy>,
        classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    ) -> RetryConfigBuilder<Req, E> {
        RetryConfigBuilder::new(taxonomy, classifier)
    }

    /// The inter-attempt delay with jitter applied.
    ///
    /// The jitter magnitude is bounded by both the configured jitter window
    /// and `delay * jitter_factor`, and is drawn uniformly from
    /// `[-bound, +bound]`. A zero base delay yields zero (the wait is
    /// skipped entirely).
    pub(crate) fn jittered_delay(&self) -> Duration {
        if self.delay.is_zero() {
            return Duration::ZERO;
        }
        let bound = self.jitter.min(self.delay.mul_f64(self.jitter_factor));
        if bound.is_zero() {
            return self.delay;
        }
        let bound = bound.as_secs_f64();
        let offset = rand::thread_rng().gen_range(-bound..=bound);
        Duration::from_secs_f64((self.delay.as_secs_f64() + offset).max(0.0))
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<Req, E> {
    max_retries: i64,
    delay: Duration,
    max_duration: Option<Duration>,
    jitter: Duration,
    jitter_factor: f64,
    classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    taxonomy: Arc<Taxonomy>,
    retry_on: Vec<Category>,
    abort_on: Vec<Category>,
    cancel_fn: Option<CancelFn<Req>>,
    name: String,
    event_listeners: EventListeners<RetryEvent>,
}

impl<Req, E> RetryConfigBuilder<Req, E> {
    /// Creates a new builder.
    ///
    /// Defaults: 3 retries, no delay, 200ms jitter window, jitter factor
    /// 0.5, retry on everything under the fault root, abort on nothing.
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    ) -> Self {
        Self {
            max_retries: 3,
            delay: Duration::ZERO,
            max_duration: None,
            jitter: Duration::from_millis(200),
            jitter_factor: 0.5,
            classifier,
            taxonomy,
            retry_on: vec![Taxonomy::FAULT],
            abort_on: Vec::new(),
            cancel_fn: None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of retries after the initial attempt.
    /// `-1` means unlimited (bounded only by `max_duration`).
    pub fn max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay between attempts. Zero skips the wait.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the overall wall-time budget measured from the first attempt.
    /// No attempt begins once the budget is spent.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Sets the jitter window.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the jitter factor; the effective jitter bound is
    /// `min(jitter, delay * jitter_factor)`.
    pub fn jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }

    /// Categories that are retried. Anything else aborts the loop.
    pub fn retry_on(mut self, categories: &[Category]) -> Self {
        self.retry_on = categories.to_vec();
        self
    }

    /// Categories that abort immediately; wins over `retry_on` on overlap.
    pub fn abort_on(mut self, categories: &[Category]) -> Self {
        self.abort_on = categories.to_vec();
        self
    }

    /// Extracts a cancellation token from each request; a firing token
    /// stops the loop without starting a new attempt and interrupts the
    /// inter-attempt sleep.
    pub fn cancellation<F>(mut self, f: F) -> Self
    where
        F: Fn(&Req) -> CancellationToken + Send + Sync + 'static,
    {
        self.cancel_fn = Some(Arc::new(f));
        self
    }

    /// Sets the name for this instance (used in events).
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback before each retry, with the attempt count so
    /// far and the delay about to be waited.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback when the call succeeds, with total attempts.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when the retry budget runs out.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when a failure's category rules retrying out.
    pub fn on_aborted<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Aborted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the retry layer, validating the configuration.
    pub fn build(self) -> Result<crate::RetryLayer<Req, E>, DefinitionError> {
        if self.max_retries < -1 {
            return Err(DefinitionError::InvalidMaxRetries(self.max_retries));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(DefinitionError::JitterFactorOutOfRange(self.jitter_factor));
        }
        if let Some(max_duration) = self.max_duration {
            if self.delay > max_duration {
                return Err(DefinitionError::DelayExceedsMaxDuration {
                    delay: self.delay,
                    max_duration,
                });
            }
        }

        let retry_on = self.taxonomy.set(&self.retry_on)?;
        let abort_on = self.taxonomy.set(&self.abort_on)?;
        let max_retries = match self.max_retries {
            -1 => None,
            n => Some(n as u64),
        };

        Ok(crate::RetryLayer::new(RetryConfig {
            max_retries,
            delay: self.delay,
            max_duration: self.max_duration,
            jitter: self.jitter,
            jitter_factor: self.jitter_factor,
            classifier: self.classifier,
            taxonomy: self.taxonomy,
            retry_on,
            abort_on,
            cancel_fn: self.cancel_fn,
            name: self.name,
            event_listeners: self.event_listeners,
        }))
    }
}
