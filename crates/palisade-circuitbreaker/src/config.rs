//! Configuration for the circuit breaker middleware.

use crate::events::CircuitBreakerEvent;
use crate::handle::CircuitHandle;
use palisade_core::taxonomy::{Category, CategorySet, Taxonomy};
use palisade_core::{DefinitionError, EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Structural configuration for one circuit: thresholds and timing.
///
/// Classification of outcomes lives in [`FailurePolicy`], which is typed by
/// the error it inspects; this struct stays type-free so the circuit state
/// can be shared across chains through a [`CircuitHandle`].
pub struct CircuitBreakerConfig {
    pub(crate) request_volume_threshold: usize,
    pub(crate) failure_ratio: f64,
    pub(crate) delay: Duration,
    pub(crate) success_threshold: usize,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

/// Builder for [`CircuitBreakerConfig`]; produces a shareable
/// [`CircuitHandle`].
pub struct CircuitBreakerConfigBuilder {
    request_volume_threshold: usize,
    failure_ratio: f64,
    delay: Duration,
    success_threshold: usize,
    name: String,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    ///
    /// Defaults: 20-sample window, 0.5 failure ratio, 5 second open delay,
    /// 1 trial success to close.
    pub fn new() -> Self {
        Self {
            request_volume_threshold: 20,
            failure_ratio: 0.5,
            delay: Duration::from_secs(5),
            success_threshold: 1,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the number of samples the rolling window holds; the failure
    /// ratio is never evaluated before the window fills.
    pub fn request_volume_threshold(mut self, threshold: usize) -> Self {
        self.request_volume_threshold = threshold;
        self
    }

    /// Sets the failure fraction at which the circuit opens.
    pub fn failure_ratio(mut self, ratio: f64) -> Self {
        self.failure_ratio = ratio;
        self
    }

    /// Sets how long the circuit stays open before probing recovery.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the number of consecutive trial successes required to close a
    /// half-open circuit.
    pub fn success_threshold(mut self, threshold: usize) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Sets the name for this instance (used in events).
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when the circuit transitions between states.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState, crate::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback when a call is allowed through the gate.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback when a call is rejected by the gate.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback when a success sample is recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback when a failure sample is recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Builds the shareable circuit handle.
    ///
    /// Fails with a [`DefinitionError`] if a threshold is zero or the
    /// failure ratio falls outside `[0, 1]`.
    pub fn build(self) -> Result<CircuitHandle, DefinitionError> {
        if self.request_volume_threshold == 0 {
            return Err(DefinitionError::ZeroRequestVolumeThreshold);
        }
        if self.success_threshold == 0 {
            return Err(DefinitionError::ZeroSuccessThreshold);
        }
        if !(0.0..=1.0).contains(&self.failure_ratio) {
            return Err(DefinitionError::FailureRatioOutOfRange(self.failure_ratio));
        }
        Ok(CircuitHandle::new(CircuitBreakerConfig {
            request_volume_threshold: self.request_volume_threshold,
            failure_ratio: self.failure_ratio,
            delay: self.delay,
            success_threshold: self.success_threshold,
            name: self.name,
            event_listeners: self.event_listeners,
        }))
    }
}

/// How one chain classifies outcomes before recording them.
///
/// The observed failure is mapped to a [`Category`] by the classifier, then
/// tested against the configured sets: a sample is a failure when its
/// category matches `fail_on` and not `skip_on` (skip wins on overlap), a
/// success otherwise, and no sample at all when it matches `discard_on`
/// (abandoned attempts, e.g. cancellation).
pub struct FailurePolicy<E> {
    classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    taxonomy: Arc<Taxonomy>,
    fail_on: CategorySet,
    skip_on: CategorySet,
    discard_on: CategorySet,
}

/// Outcome of classifying one completed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// Record a failure sample.
    Failure,
    /// Record a success sample.
    Success,
    /// Record nothing.
    Discard,
}

impl<E> FailurePolicy<E> {
    /// Creates a policy with the default sets: everything under the fault
    /// root is a failure, cancellations are discarded.
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    ) -> Result<Self, DefinitionError> {
        let fail_on = taxonomy.set(&[Taxonomy::FAULT])?;
        let discard_on = taxonomy.set(&[Taxonomy::CANCELLED])?;
        Ok(Self {
            classifier,
            skip_on: taxonomy.empty_set(),
            fail_on,
            discard_on,
            taxonomy,
        })
    }

    /// Replaces the failure set.
    pub fn fail_on(mut self, categories: &[Category]) -> Result<Self, DefinitionError> {
        self.fail_on = self.taxonomy.set(categories)?;
        Ok(self)
    }

    /// Replaces the skip set; skip wins over fail on overlap.
    pub fn skip_on(mut self, categories: &[Category]) -> Result<Self, DefinitionError> {
        self.skip_on = self.taxonomy.set(categories)?;
        Ok(self)
    }

    /// Classifies one failure.
    pub fn assess(&self, error: &E) -> Assessment {
        let category = (self.classifier)(error);
        if self.taxonomy.matches(category, &self.discard_on) {
            Assessment::Discard
        } else if self.taxonomy.matches(category, &self.fail_on)
            && !self.taxonomy.matches(category, &self.skip_on)
        {
            Assessment::Failure
        } else {
            Assessment::Success
        }
    }
}

impl<E> Clone for FailurePolicy<E> {
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
            taxonomy: Arc::clone(&self.taxonomy),
            fail_on: self.fail_on.clone(),
            skip_on: self.skip_on.clone(),
            discard_on: self.discard_on.clone(),
        }
    }
}
