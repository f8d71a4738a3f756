//! Fallback middleware for guarded calls.
//!
//! Invokes the inner service and, when it ultimately fails, substitutes an
//! alternate result. Whether the fallback applies is decided by the
//! failure's category against the configured `apply_on`/`skip_on` sets
//! (skip wins on overlap); excluded failures propagate unchanged.
//!
//! Three strategies are supported, mutually exclusive per call site:
//! a capability-typed [`FallbackHandler`] receiving the full
//! [`FallbackContext`], a method with the original argument signature, or
//! a zero-argument method. The fallback executes as plain code: it is
//! not itself retried, timed out, or circuit-broken.
//!
//! ```rust
//! use palisade_fallback::FallbackConfig;
//! use palisade_core::{taxonomy::Taxonomy, FaultError};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), palisade_core::DefinitionError> {
//! let taxonomy = Arc::new(Taxonomy::builtin());
//! let layer = FallbackConfig::<String, String, FaultError<String>>::builder(
//!     Arc::clone(&taxonomy),
//!     Arc::new(|_| Taxonomy::FAULT),
//! )
//! .method(|req: String| async move { Ok(format!("cached: {}", req)) })
//! .name("catalog")
//! .build()?;
//! # let _ = layer;
//! # Ok(())
//! # }
//! ```

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::counter;

pub use config::{FallbackConfig, FallbackConfigBuilder};
pub use events::FallbackEvent;
pub use layer::FallbackLayer;

mod config;
mod events;
mod layer;

/// Everything a capability-typed fallback handler learns about the failed
/// invocation.
#[derive(Debug)]
pub struct FallbackContext<Req, E> {
    /// The original call arguments.
    pub args: Req,
    /// The call-site identity the chain was built for.
    pub site: String,
    /// The failure that triggered the fallback.
    pub cause: E,
}

/// A polymorphic fallback capability: given the invocation context,
/// produce a substitute result.
pub trait FallbackHandler<Req, Res, E>: Send + Sync {
    /// Handles the failed invocation.
    fn handle(&self, context: FallbackContext<Req, E>) -> BoxFuture<'static, Result<Res, E>>;
}

pub(crate) type MethodFn<Req, Res, E> =
    Arc<dyn Fn(Req) -> BoxFuture<'static, Result<Res, E>> + Send + Sync>;
pub(crate) type MethodNoArgsFn<Res, E> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Res, E>> + Send + Sync>;

/// The configured fallback mechanism, resolved at setup.
pub(crate) enum FallbackStrategy<Req, Res, E> {
    Handler(Arc<dyn FallbackHandler<Req, Res, E>>),
    Method(MethodFn<Req, Res, E>),
    MethodNoArgs(MethodNoArgsFn<Res, E>),
}

/// A Tower service that substitutes an alternate result when the inner
/// service fails.
pub struct Fallback<S, Req, Res, E> {
    inner: S,
    config: Option<Arc<FallbackConfig<Req, Res, E>>>,
}

impl<S, Req, Res, E> Fallback<S, Req, Res, E> {
    pub(crate) fn new(inner: S, config: Option<Arc<FallbackConfig<Req, Res, E>>>) -> Self {
        Self { inner, config }
    }
}

impl<S: Clone, Req, Res, E> Clone for Fallback<S, Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, Req, Res, E> Service<Req> for Fallback<S, Req, Res, E>
where
    S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + Sync + 'static,
    Res: Send + 'static,
    E: Send + 'static,
{
    type Response = Res;
    type Error = E;
    type Future = BoxFuture<'static, Result<Res, E>>;

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

            let args = req.clone();
            let error = match inner.call(req).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            let category = (config.classifier)(&error);
            let excluded = config.taxonomy.matches(category, &config.skip_on)
                || !config.taxonomy.matches(category, &config.apply_on);
            if excluded {
                config.event_listeners.emit(&FallbackEvent::Skipped {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                });

                #[cfg(feature = "metrics")]
                counter!("fallback_calls_total", "fallback" => config.name.clone(), "outcome" => "skipped")
                    .increment(1);

                return Err(error);
            }

            let result = config.invoke(args, error).await;

            let event = match &result {
                Ok(_) => FallbackEvent::Applied {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                },
                Err(_) => FallbackEvent::Failed {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                },
            };
            config.event_listeners.emit(&event);

            #[cfg(feature = "metrics")]
            {
                let outcome = if result.is_ok() { "applied" } else { "failed" };
                counter!("fallback_calls_total", "fallback" => config.name.clone(), "outcome" => outcome)
                    .increment(1);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                fallback = %config.name,
                applied = result.is_ok(),
                "fallback invoked"
            );

            result
        })
    }
}
