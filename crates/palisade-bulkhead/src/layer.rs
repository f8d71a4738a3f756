use crate::handle::BulkheadHandle;
use crate::Bulkhead;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::Layer;

/// Extracts the cancellation token observed during a queued wait.
pub type CancelFn<Req> = Arc<dyn Fn(&Req) -> CancellationToken + Send + Sync>;

/// A Tower layer that applies concurrency limiting to an inner service.
pub struct BulkheadLayer<Req> {
    handle: Option<BulkheadHandle>,
    cancel_fn: Option<CancelFn<Req>>,
}

impl<Req> Clone for BulkheadLayer<Req> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            cancel_fn: self.cancel_fn.clone(),
        }
    }
}

impl<Req> BulkheadLayer<Req> {
    /// Creates a new builder for configuring a bulkhead layer.
    pub fn builder() -> crate::BulkheadConfigBuilder<Req> {
        crate::BulkheadConfigBuilder::new()
    }

    /// Creates a layer admitting against an existing shared limiter.
    pub fn with_handle(handle: BulkheadHandle, cancel_fn: Option<CancelFn<Req>>) -> Self {
        Self {
            handle: Some(handle),
            cancel_fn,
        }
    }

    /// A pass-through layer with no limiter configured.
    pub fn disabled() -> Self {
        Self {
            handle: None,
            cancel_fn: None,
        }
    }

    /// The shared limiter this layer admits against, if any.
    pub fn handle(&self) -> Option<&BulkheadHandle> {
        self.handle.as_ref()
    }
}

impl<S, Req> Layer<S> for BulkheadLayer<Req> {
    type Service = Bulkhead<S, Req>;

    fn layer(&self, service: S) -> Self::Service {
        Bulkhead::new(service, self.handle.clone(), self.cancel_fn.clone())
    }
}
