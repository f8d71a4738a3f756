//! Configuration for the bulkhead middleware.

use crate::events::BulkheadEvent;
use crate::handle::BulkheadHandle;
use crate::layer::{BulkheadLayer, CancelFn};
use palisade_core::{EventListeners, FnListener};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How admission behaves once every execution slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkheadMode {
    /// Fail fast: no free slot means immediate rejection. Admission never
    /// suspends in this mode.
    Semaphore,
    /// Park up to `wait_queue_size` invocations in a FIFO queue; reject
    /// once the queue is also full.
    Queued {
        /// Maximum number of parked invocations.
        wait_queue_size: usize,
    },
}

/// Builder for a [`BulkheadLayer`].
pub struct BulkheadConfigBuilder<Req> {
    capacity: usize,
    mode: BulkheadMode,
    name: String,
    event_listeners: EventListeners<BulkheadEvent>,
    cancel_fn: Option<CancelFn<Req>>,
}

impl<Req> Default for BulkheadConfigBuilder<Req> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req> BulkheadConfigBuilder<Req> {
    /// Creates a new builder.
    ///
    /// Defaults: capacity 10, semaphore mode.
    pub fn new() -> Self {
        Self {
            capacity: 10,
            mode: BulkheadMode::Semaphore,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
            cancel_fn: None,
        }
    }

    /// Sets the maximum number of concurrent executions.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the admission mode.
    pub fn mode(mut self, mode: BulkheadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the name for this instance (used in events).
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Extracts a cancellation token from each request; a queued wait also
    /// resolves when the token fires.
    pub fn cancellation<F>(mut self, f: F) -> Self
    where
        F: Fn(&Req) -> CancellationToken + Send + Sync + 'static,
    {
        self.cancel_fn = Some(Arc::new(f));
        self
    }

    /// Registers a callback when a call is admitted.
    pub fn on_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::Permitted { in_flight, .. } = event {
                f(*in_flight);
            }
        }));
        self
    }

    /// Registers a callback when admission is refused.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, BulkheadEvent::Rejected { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback when a call is parked in the wait queue.
    pub fn on_enqueued<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, BulkheadEvent::Enqueued { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the bulkhead layer with its own private limiter.
    pub fn build(self) -> BulkheadLayer<Req> {
        let handle = BulkheadHandle::new(self.capacity, self.mode, self.name, self.event_listeners);
        BulkheadLayer::with_handle(handle, self.cancel_fn)
    }

    /// Builds only the shared limiter, for callers that distribute one
    /// limiter across several chains.
    pub fn build_handle(self) -> BulkheadHandle {
        BulkheadHandle::new(self.capacity, self.mode, self.name, self.event_listeners)
    }
}
