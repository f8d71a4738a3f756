use crate::config::FailurePolicy;
use crate::handle::CircuitHandle;
use crate::CircuitBreaker;
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that applies circuit breaking to an inner service.
///
/// The layer is built around a [`CircuitHandle`]; layering the same handle
/// into several stacks makes them share one circuit.
pub struct CircuitBreakerLayer<E> {
    handle: Option<CircuitHandle>,
    policy: Option<Arc<FailurePolicy<E>>>,
}

impl<E> Clone for CircuitBreakerLayer<E> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<E> CircuitBreakerLayer<E> {
    /// Creates a layer gating through an existing shared circuit.
    pub fn with_handle(handle: CircuitHandle, policy: FailurePolicy<E>) -> Self {
        Self {
            handle: Some(handle),
            policy: Some(Arc::new(policy)),
        }
    }

    /// A pass-through layer with no circuit configured.
    pub fn disabled() -> Self {
        Self {
            handle: None,
            policy: None,
        }
    }

    /// The shared circuit this layer gates through, if any.
    pub fn handle(&self) -> Option<&CircuitHandle> {
        self.handle.as_ref()
    }
}

impl<S, E> Layer<S> for CircuitBreakerLayer<E> {
    type Service = CircuitBreaker<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, self.handle.clone(), self.policy.clone())
    }
}
