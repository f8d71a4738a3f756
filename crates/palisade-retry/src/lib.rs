//! Retry middleware for guarded calls.
//!
//! Re-invokes the inner service until one of the stopping rules fires:
//!
//! - the attempt succeeds (returned immediately, no further retries),
//! - the failure's category matches `abort_on` (wins over `retry_on` on
//!   overlap),
//! - the failure's category does not match `retry_on`,
//! - the retry budget is exhausted (`max_retries`, with `-1` meaning
//!   unlimited),
//! - the wall-time budget `max_duration`, measured from the first attempt,
//!   is spent; this is checked before every new attempt and takes
//!   precedence over remaining retries.
//!
//! Between attempts the loop sleeps `delay ± jitter`, where the jitter
//! magnitude is bounded by both the configured jitter window and
//! `delay * jitter_factor`; a zero delay skips the wait entirely. The
//! sleep also resolves if the invocation's cancellation token fires, so a
//! cancelled caller never pays for another attempt.
//!
//! Synthetic failures from inner layers (open circuit, full bulkhead,
//! elapsed deadline) carry ordinary categories and flow through the same
//! `retry_on`/`abort_on` evaluation; nothing bypasses the loop.
//!
//! Only the most recent failure propagates after the loop stops;
//! intermediate failures are discarded.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::time::sleep;
use tokio::time::Instant as TokioInstant;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use tracing::debug;

use palisade_core::Interrupted;

pub use config::{CancelFn, RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use layer::RetryLayer;

mod config;
mod events;
mod layer;

/// A Tower service that retries failed calls to an inner service.
pub struct Retry<S, Req, E> {
    inner: S,
    config: Option<Arc<RetryConfig<Req, E>>>,
}

impl<S, Req, E> Retry<S, Req, E> {
    pub(crate) fn new(inner: S, config: Option<Arc<RetryConfig<Req, E>>>) -> Self {
        Self { inner, config }
    }
}

impl<S: Clone, Req, E> Clone for Retry<S, Req, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, Req, E> Service<Req> for Retry<S, Req, E>
where
    S: Service<Req, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    E: From<Interrupted> + Send + 'static,
    Req: Clone + Send + Sync + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut inner = self.inner.clone();
        let config = self.config.clone();

        Box::pin(async move {
            let Some(config) = config else {
                return inner.call(req).await;
            };

            let cancel = config.cancel_fn.as_ref().map(|f| f(&req));
            // The budget clock has to follow the runtime's (possibly
            // paused) time source, not the system clock.
            let started = TokioInstant::now();
            let mut attempts: u64 = 0;

            loop {
                if let Some(token) = &cancel {
                    if token.is_cancelled() {
                        return Err(Interrupted.into());
                    }
                }

                let result = inner.call(req.clone()).await;
                attempts += 1;

                let error = match result {
                    Ok(response) => {
                        config.event_listeners.emit(&RetryEvent::Success {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempts,
                        });

                        #[cfg(feature = "metrics")]
                        counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "success")
                            .increment(1);

                        return Ok(response);
                    }
                    Err(error) => error,
                };

                let category = (config.classifier)(&error);
                let aborts = config.taxonomy.matches(category, &config.abort_on)
                    || !config.taxonomy.matches(category, &config.retry_on);
                if aborts {
                    config.event_listeners.emit(&RetryEvent::Aborted {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "aborted")
                        .increment(1);

                    return Err(error);
                }

                let budget_spent = config
                    .max_duration
                    .is_some_and(|budget| started.elapsed() >= budget);
                let retries_spent = config.max_retries.is_some_and(|max| attempts > max);
                if budget_spent || retries_spent {
                    config.event_listeners.emit(&RetryEvent::Exhausted {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "outcome" => "exhausted")
                        .increment(1);

                    return Err(error);
                }

                let delay = config.jittered_delay();
                config.event_listeners.emit(&RetryEvent::Retry {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt: attempts,
                    delay,
                });

                #[cfg(feature = "tracing")]
                debug!(
                    retry = %config.name,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "attempt failed, retrying"
                );

                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                if !delay.is_zero() {
                    match &cancel {
                        Some(token) => {
                            tokio::select! {
                                _ = sleep(delay) => {}
                                _ = token.cancelled() => return Err(Interrupted.into()),
                            }
                        }
                        None => sleep(delay).await,
                    }
                }

                // No attempt begins once the wall-time budget is spent.
                if config
                    .max_duration
                    .is_some_and(|budget| started.elapsed() >= budget)
                {
                    config.event_listeners.emit(&RetryEvent::Exhausted {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts,
                    });
                    return Err(error);
                }
            }
        })
    }
}
