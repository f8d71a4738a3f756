use crate::config::RetryConfig;
use crate::Retry;
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that applies the retry loop to an inner service.
pub struct RetryLayer<Req, E> {
    config: Option<Arc<RetryConfig<Req, E>>>,
}

impl<Req, E> Clone for RetryLayer<Req, E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl<Req, E> RetryLayer<Req, E> {
    pub(crate) fn new(config: RetryConfig<Req, E>) -> Self {
        Self {
            config: Some(Arc::new(config)),
        }
    }

    /// A pass-through layer that makes a single attempt and never retries.
    pub fn disabled() -> Self {
        Self { config: None }
    }

    pub(crate) fn config(&self) -> Option<&RetryConfig<Req, E>> {
        self.config.as_deref()
    }
}

impl<S, Req, E> Layer<S> for RetryLayer<Req, E> {
    type Service = Retry<S, Req, E>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, self.config.clone())
    }
}
