//! The per-call request envelope and the target adapter.

use futures::future::BoxFuture;
use palisade_core::FaultError;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tower::Service;

/// One invocation travelling down the chain: the caller's arguments plus
/// the cancellation token every suspension point observes.
///
/// Every layer sees the same envelope; retry re-invocations clone it, so
/// each physical attempt carries the same arguments and the same token.
#[derive(Debug, Clone)]
pub struct Invocation<A> {
    /// The guarded operation's arguments.
    pub args: A,
    /// Fires when the caller cancels the invocation.
    pub cancel: CancellationToken,
}

pub(crate) type TargetFn<A, R, E> =
    Arc<dyn Fn(A) -> BoxFuture<'static, Result<R, E>> + Send + Sync>;

/// Adapts the guarded operation into the innermost chain service.
///
/// The target's future is awaited here, inside every outer layer, so a
/// target that returns an already-failed future still feeds retry,
/// circuit-breaker, and fallback evaluation with the unwrapped failure.
pub(crate) struct TargetService<A, R, E> {
    f: TargetFn<A, R, E>,
}

impl<A, R, E> TargetService<A, R, E> {
    pub(crate) fn new(f: TargetFn<A, R, E>) -> Self {
        Self { f }
    }
}

impl<A, R, E> Clone for TargetService<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<A, R, E> Service<Invocation<A>> for TargetService<A, R, E>
where
    A: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    type Response = R;
    type Error = FaultError<E>;
    type Future = BoxFuture<'static, Result<R, FaultError<E>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, invocation: Invocation<A>) -> Self::Future {
        let fut = (self.f)(invocation.args);
        Box::pin(async move { fut.await.map_err(FaultError::Application) })
    }
}
