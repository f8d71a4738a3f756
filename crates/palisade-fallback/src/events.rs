//! Events emitted by the fallback middleware.

use palisade_core::PatternEvent;
use std::time::Instant;

/// Events emitted by the fallback handler.
#[derive(Debug, Clone)]
pub enum FallbackEvent {
    /// The inner call failed and the fallback produced a result.
    Applied {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// The inner call failed but its category excluded the fallback; the
    /// original failure propagated.
    Skipped {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// The fallback itself failed.
    Failed {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
}

impl PatternEvent for FallbackEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FallbackEvent::Applied { .. } => "applied",
            FallbackEvent::Skipped { .. } => "skipped",
            FallbackEvent::Failed { .. } => "failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            FallbackEvent::Applied { timestamp, .. } => *timestamp,
            FallbackEvent::Skipped { timestamp, .. } => *timestamp,
            FallbackEvent::Failed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            FallbackEvent::Applied { pattern_name, .. } => pattern_name,
            FallbackEvent::Skipped { pattern_name, .. } => pattern_name,
            FallbackEvent::Failed { pattern_name, .. } => pattern_name,
        }
    }
}
