//! The asynchronous invocation handle.

use palisade_core::FaultError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a guarded invocation running on its own task.
///
/// Returned by [`GuardedCall::spawn`](crate::GuardedCall::spawn). Awaiting
/// the handle yields the same outcome the synchronous entry point would
/// have produced. [`cancel`](AsyncExecution::cancel) promptly interrupts
/// the in-flight work: the cancellation token stops a sleeping retry delay
/// or a queued bulkhead wait cooperatively, and the task abort drops an
/// in-flight target at its next suspension point, releasing held permits
/// through their RAII guards.
///
/// Dropping the handle detaches the invocation: it keeps running to
/// completion, like a task join handle.
pub struct AsyncExecution<R, E> {
    handle: JoinHandle<Result<R, FaultError<E>>>,
    cancel: CancellationToken,
}

impl<R, E> AsyncExecution<R, E> {
    pub(crate) fn new(
        handle: JoinHandle<Result<R, FaultError<E>>>,
        cancel: CancellationToken,
    ) -> Self {
        Self { handle, cancel }
    }

    /// Cancels the invocation. Awaiting the handle afterwards yields
    /// [`FaultError::Cancelled`] unless an outcome was already produced.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.handle.abort();
    }

    /// Whether the underlying task has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// The token observed by the invocation's suspension points.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl<R, E> Future for AsyncExecution<R, E> {
    type Output = Result<R, FaultError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.handle).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(join_error)) => {
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
                Poll::Ready(Err(FaultError::Cancelled))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
