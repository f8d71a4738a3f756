//! Events emitted by the retry middleware.

use palisade_core::PatternEvent;
use std::time::{Duration, Instant};

/// Events emitted by the retry loop.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed and a retry is about to be scheduled.
    Retry {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Attempts made so far (including the failed one).
        attempt: u64,
        /// Jittered delay before the next attempt.
        delay: Duration,
    },
    /// The call succeeded.
    Success {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Total attempts made (1 = no retries were needed).
        attempts: u64,
    },
    /// The retry budget (attempts or overall duration) ran out.
    Exhausted {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Total attempts made.
        attempts: u64,
    },
    /// The failure's category ruled retrying out.
    Aborted {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Total attempts made.
        attempts: u64,
    },
}

impl PatternEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::Aborted { .. } => "aborted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. } => *timestamp,
            RetryEvent::Success { timestamp, .. } => *timestamp,
            RetryEvent::Exhausted { timestamp, .. } => *timestamp,
            RetryEvent::Aborted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::Retry { pattern_name, .. } => pattern_name,
            RetryEvent::Success { pattern_name, .. } => pattern_name,
            RetryEvent::Exhausted { pattern_name, .. } => pattern_name,
            RetryEvent::Aborted { pattern_name, .. } => pattern_name,
        }
    }
}
