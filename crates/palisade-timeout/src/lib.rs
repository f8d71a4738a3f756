//! Deadline middleware for guarded calls.
//!
//! Runs the inner service with a deadline. If the inner call produces an
//! outcome strictly before the deadline, that outcome is returned
//! unmodified, failures included. If the deadline elapses first, the
//! in-flight inner future is dropped (cancelling the target) and the call
//! fails with a timeout. The race between completion and expiry is decided
//! by the single-winner semantics of the deadline future: whichever branch
//! completes first is final and the loser is cancelled.
//!
//! With no duration configured the guard is a structural no-op that
//! forwards calls untouched, preserving uniform layer composition.
//!
//! ```rust
//! use palisade_timeout::TimeoutLayer;
//! use tower::{Layer, service_fn};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let layer = TimeoutLayer::builder()
//!     .duration(Duration::from_millis(100))
//!     .name("lookup")
//!     .on_timeout(|| eprintln!("lookup timed out"))
//!     .build();
//!
//! let svc = service_fn(|req: String| async move {
//!     Ok::<_, palisade_core::FaultError<String>>(req)
//! });
//! let mut service = layer.layer(svc);
//! # }
//! ```

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::time::timeout;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use config::{TimeoutConfig, TimeoutConfigBuilder};
pub use error::TimeoutError;
pub use events::TimeoutEvent;
pub use layer::TimeoutLayer;

mod config;
mod error;
mod events;
mod layer;

/// A Tower service that applies a deadline to an inner service.
#[derive(Clone)]
pub struct Timeout<S> {
    inner: S,
    config: Arc<TimeoutConfig>,
}

impl<S> Timeout<S> {
    pub(crate) fn new(inner: S, config: Arc<TimeoutConfig>) -> Self {
        Self { inner, config }
    }
}

impl<S, Req> Service<Req> for Timeout<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<TimeoutError> + Send + 'static,
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
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let Some(after) = config.duration else {
                return inner.call(req).await;
            };

            let start = Instant::now();
            match timeout(after, inner.call(req)).await {
                Ok(result) => {
                    let duration = start.elapsed();
                    config.event_listeners.emit(&TimeoutEvent::Completed {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        duration,
                        succeeded: result.is_ok(),
                    });

                    #[cfg(feature = "metrics")]
                    {
                        let outcome = if result.is_ok() { "success" } else { "error" };
                        counter!("timeout_calls_total", "timeout" => config.name.clone(), "outcome" => outcome).increment(1);
                        histogram!("timeout_call_duration_seconds", "timeout" => config.name.clone())
                            .record(duration.as_secs_f64());
                    }

                    #[cfg(feature = "tracing")]
                    debug!(
                        timeout = %config.name,
                        duration_ms = duration.as_millis(),
                        "call completed within deadline"
                    );

                    result
                }
                Err(_elapsed) => {
                    config.event_listeners.emit(&TimeoutEvent::TimedOut {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        after,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("timeout_calls_total", "timeout" => config.name.clone(), "outcome" => "timeout").increment(1);

                    #[cfg(feature = "tracing")]
                    warn!(
                        timeout = %config.name,
                        deadline_ms = after.as_millis(),
                        "deadline elapsed, inner call cancelled"
                    );

                    Err(TimeoutError { after }.into())
                }
            }
        })
    }
}
