//! Configuration for the timeout middleware.

use crate::events::TimeoutEvent;
use palisade_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the timeout guard.
pub struct TimeoutConfig {
    pub(crate) duration: Option<Duration>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<TimeoutEvent>,
}

impl TimeoutConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TimeoutConfigBuilder {
        TimeoutConfigBuilder::new()
    }
}

/// Builder for [`TimeoutConfig`].
pub struct TimeoutConfigBuilder {
    duration: Option<Duration>,
    name: String,
    event_listeners: EventListeners<TimeoutEvent>,
}

impl Default for TimeoutConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutConfigBuilder {
    /// Creates a new builder. With no duration configured the guard is a
    /// pass-through.
    pub fn new() -> Self {
        Self {
            duration: None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the deadline applied to every call.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the name for this instance (used in events).
    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a call completes before the deadline.
    ///
    /// The callback receives the call duration and whether the outcome was
    /// a success.
    pub fn on_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration, bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::Completed {
                duration,
                succeeded,
                ..
            } = event
            {
                f(*duration, *succeeded);
            }
        }));
        self
    }

    /// Registers a callback when the deadline elapses.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, TimeoutEvent::TimedOut { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the timeout layer.
    pub fn build(self) -> crate::TimeoutLayer {
        crate::TimeoutLayer::new(TimeoutConfig {
            duration: self.duration,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}
