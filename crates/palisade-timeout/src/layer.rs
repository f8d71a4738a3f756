use crate::config::TimeoutConfig;
use crate::Timeout;
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that applies a deadline to an inner service.
#[derive(Clone)]
pub struct TimeoutLayer {
    config: Arc<TimeoutConfig>,
}

impl TimeoutLayer {
    /// Creates a new `TimeoutLayer` from the given configuration.
    pub(crate) fn new(config: TimeoutConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a timeout layer.
    pub fn builder() -> crate::TimeoutConfigBuilder {
        crate::TimeoutConfigBuilder::new()
    }

    /// A pass-through layer with no deadline configured.
    pub fn disabled() -> Self {
        Self::builder().build()
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = Timeout<S>;

    fn layer(&self, service: S) -> Self::Service {
        Timeout::new(service, Arc::clone(&self.config))
    }
}
