//! Configuration for the fallback middleware.

use crate::events::FallbackEvent;
use crate::{FallbackContext, FallbackHandler, FallbackStrategy};
use futures::future::BoxFuture;
use palisade_core::taxonomy::{Category, CategorySet, Taxonomy};
use palisade_core::{DefinitionError, EventListeners, FnListener};
use std::sync::Arc;

/// Configuration for the fallback handler.
pub struct FallbackConfig<Req, Res, E> {
    pub(crate) strategy: FallbackStrategy<Req, Res, E>,
    pub(crate) classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    pub(crate) taxonomy: Arc<Taxonomy>,
    pub(crate) apply_on: CategorySet,
    pub(crate) skip_on: CategorySet,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<FallbackEvent>,
}

impl<Req, Res, E> FallbackConfig<Req, Res, E> {
    /// Creates a new configuration builder.
    pub fn builder(
        taxonomy: Arc<Taxonomy>,
        classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    ) -> FallbackConfigBuilder<Req, Res, E> {
        FallbackConfigBuilder::new(taxonomy, classifier)
    }
}

/// Builder for [`FallbackConfig`].
///
/// Exactly one strategy must be configured: a capability-typed
/// [`FallbackHandler`], a method with the original argument signature, or
/// a zero-argument method. Configuring more than one is a definition
/// error, mirroring the at-most-one-fallback rule of the policy model.
pub struct FallbackConfigBuilder<Req, Res, E> {
    strategies: Vec<FallbackStrategy<Req, Res, E>>,
    classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    taxonomy: Arc<Taxonomy>,
    apply_on: Vec<Category>,
    skip_on: Vec<Category>,
    name: String,
    event_listeners: EventListeners<FallbackEvent>,
}

impl<Req, Res, E> FallbackConfigBuilder<Req, Res, E> {
    /// Creates a new builder.
    ///
    /// Defaults: apply on everything under the fault root, skip nothing.
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        classifier: Arc<dyn Fn(&E) -> Category + Send + Sync>,
    ) -> Self {
        Self {
            strategies: Vec::new(),
            classifier,
            taxonomy,
            apply_on: vec![Taxonomy::FAULT],
            skip_on: Vec::new(),
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets a capability-typed handler receiving the full invocation
    /// context (arguments, call-site name, failure cause).
    pub fn handler<H>(mut self, handler: H) -> Self
    where
        H: FallbackHandler<Req, Res, E> + 'static,
    {
        self.strategies
            .push(FallbackStrategy::Handler(Arc::new(handler)));
        self
    }

    /// Sets a fallback method with the original argument signature.
    pub fn method<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Res, E>> + Send + 'static,
    {
        self.strategies.push(FallbackStrategy::Method(Arc::new(
            move |req| -> BoxFuture<'static, Result<Res, E>> { Box::pin(f(req)) },
        )));
        self
    }

    /// Sets a zero-argument fallback method.
    pub fn method_no_args<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Res, E>> + Send + 'static,
    {
        self.strategies.push(FallbackStrategy::MethodNoArgs(Arc::new(
            move || -> BoxFuture<'static, Result<Res, E>> { Box::pin(f()) },
        )));
        self
    }

    /// Categories the fallback applies to.
    pub fn apply_on(mut self, categories: &[Category]) -> Self {
        self.apply_on = categories.to_vec();
        self
    }

    /// Categories excluded from the fallback; wins over `apply_on` on
    /// overlap.
    pub fn skip_on(mut self, categories: &[Category]) -> Self {
        self.skip_on = categories.to_vec();
        self
    }

    /// Sets the name for this instance (used in events and passed to the
    /// handler as the call-site identity).
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when the fallback produces a result.
    pub fn on_applied<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, FallbackEvent::Applied { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback when a failure's category excluded the
    /// fallback.
    pub fn on_skipped<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, FallbackEvent::Skipped { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the fallback layer, validating the configuration.
    pub fn build(mut self) -> Result<crate::FallbackLayer<Req, Res, E>, DefinitionError> {
        if self.strategies.len() > 1 {
            return Err(DefinitionError::ConflictingFallback);
        }
        let strategy = self
            .strategies
            .pop()
            .ok_or(DefinitionError::MissingFallback)?;
        let apply_on = self.taxonomy.set(&self.apply_on)?;
        let skip_on = self.taxonomy.set(&self.skip_on)?;

        Ok(crate::FallbackLayer::new(FallbackConfig {
            strategy,
            classifier: self.classifier,
            taxonomy: self.taxonomy,
            apply_on,
            skip_on,
            name: self.name,
            event_listeners: self.event_listeners,
        }))
    }
}

impl<Req, Res, E> FallbackConfig<Req, Res, E> {
    pub(crate) fn invoke(
        &self,
        args: Req,
        cause: E,
    ) -> BoxFuture<'static, Result<Res, E>>
    where
        Req: Send + 'static,
        E: Send + 'static,
        Res: Send + 'static,
    {
        match &self.strategy {
            FallbackStrategy::Handler(handler) => handler.handle(FallbackContext {
                args,
                site: self.name.clone(),
                cause,
            }),
            FallbackStrategy::Method(f) => f(args),
            FallbackStrategy::MethodNoArgs(f) => f(),
        }
    }
}
