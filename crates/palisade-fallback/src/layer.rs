use crate::config::FallbackConfig;
use crate::Fallback;
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that applies fallback handling to an inner service.
pub struct FallbackLayer<Req, Res, E> {
    config: Option<Arc<FallbackConfig<Req, Res, E>>>,
}

impl<Req, Res, E> Clone for FallbackLayer<Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl<Req, Res, E> FallbackLayer<Req, Res, E> {
    pub(crate) fn new(config: FallbackConfig<Req, Res, E>) -> Self {
        Self {
            config: Some(Arc::new(config)),
        }
    }

    /// A pass-through layer that propagates failures unchanged.
    pub fn disabled() -> Self {
        Self { config: None }
    }
}

impl<S, Req, Res, E> Layer<S> for FallbackLayer<Req, Res, E> {
    type Service = Fallback<S, Req, Res, E>;

    fn layer(&self, service: S) -> Self::Service {
        Fallback::new(service, self.config.clone())
    }
}
