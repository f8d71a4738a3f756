//! Concurrency-limiting middleware for guarded calls.
//!
//! A bulkhead caps the number of executions in flight for one call site.
//! Admission is a single atomic gate: either a slot is free and the call
//! runs, or the call is rejected (semaphore mode) or parked in a bounded
//! FIFO queue (queued mode). The slot is an RAII permit, so it is released
//! on every exit path: success, failure, timeout, or cancellation of the
//! invocation future.
//!
//! ```rust
//! use palisade_bulkhead::{BulkheadLayer, BulkheadMode};
//! use tower::{Layer, service_fn};
//!
//! # async fn example() {
//! let layer = BulkheadLayer::<String>::builder()
//!     .capacity(8)
//!     .mode(BulkheadMode::Queued { wait_queue_size: 16 })
//!     .name("payments")
//!     .build();
//!
//! let svc = service_fn(|req: String| async move {
//!     Ok::<_, palisade_core::FaultError<String>>(req)
//! });
//! let mut service = layer.layer(svc);
//! # }
//! ```

use futures::future::BoxFuture;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

pub use config::{BulkheadConfigBuilder, BulkheadMode};
pub use error::BulkheadError;
pub use events::BulkheadEvent;
pub use handle::BulkheadHandle;
pub use layer::{BulkheadLayer, CancelFn};

mod config;
mod error;
mod events;
mod handle;
mod layer;

/// A Tower service that limits concurrent calls to an inner service.
pub struct Bulkhead<S, Req> {
    inner: S,
    handle: Option<BulkheadHandle>,
    cancel_fn: Option<CancelFn<Req>>,
}

impl<S, Req> Bulkhead<S, Req> {
    pub(crate) fn new(
        inner: S,
        handle: Option<BulkheadHandle>,
        cancel_fn: Option<CancelFn<Req>>,
    ) -> Self {
        Self {
            inner,
            handle,
            cancel_fn,
        }
    }
}

impl<S: Clone, Req> Clone for Bulkhead<S, Req> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            handle: self.handle.clone(),
            cancel_fn: self.cancel_fn.clone(),
        }
    }
}

impl<S, Req> Service<Req> for Bulkhead<S, Req>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<BulkheadError> + Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut inner = self.inner.clone();
        let handle = self.handle.clone();
        let cancel = self.cancel_fn.as_ref().map(|f| f(&req));

        Box::pin(async move {
            let Some(handle) = handle else {
                return inner.call(req).await;
            };

            let start = Instant::now();
            let permit = match handle.admit(cancel.as_ref()).await {
                Ok(permit) => permit,
                Err(err) => return Err(err.into()),
            };

            let result = inner.call(req).await;
            drop(permit);

            handle.emit_finished(start.elapsed(), result.is_ok());
            result
        })
    }
}
