//! Events emitted by the timeout middleware.

use palisade_core::PatternEvent;
use std::time::{Duration, Instant};

/// Events emitted by the timeout guard.
#[derive(Debug, Clone)]
pub enum TimeoutEvent {
    /// The inner call produced an outcome before the deadline.
    Completed {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// How long the call took.
        duration: Duration,
        /// Whether the outcome was a success.
        succeeded: bool,
    },
    /// The deadline elapsed first; the inner call was cancelled.
    TimedOut {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The configured deadline.
        after: Duration,
    },
}

impl PatternEvent for TimeoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeoutEvent::Completed { .. } => "completed",
            TimeoutEvent::TimedOut { .. } => "timed_out",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeoutEvent::Completed { timestamp, .. } => *timestamp,
            TimeoutEvent::TimedOut { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TimeoutEvent::Completed { pattern_name, .. } => pattern_name,
            TimeoutEvent::TimedOut { pattern_name, .. } => pattern_name,
        }
    }
}
