//! Events emitted by the bulkhead middleware.

use palisade_core::PatternEvent;
use std::time::{Duration, Instant};

/// Events emitted by the bulkhead.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A call was admitted and holds an execution slot.
    Permitted {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Executions in flight after this admission.
        in_flight: usize,
    },
    /// A call was parked in the wait queue (queued mode only).
    Enqueued {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// Admission was refused.
    Rejected {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Maximum concurrent executions permitted.
        capacity: usize,
    },
    /// An admitted call finished and released its slot.
    Finished {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Total time from admission attempt to completion.
        duration: Duration,
        /// Whether the call produced a success.
        succeeded: bool,
    },
}

impl PatternEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkheadEvent::Permitted { .. } => "permitted",
            BulkheadEvent::Enqueued { .. } => "enqueued",
            BulkheadEvent::Rejected { .. } => "rejected",
            BulkheadEvent::Finished { .. } => "finished",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BulkheadEvent::Permitted { timestamp, .. } => *timestamp,
            BulkheadEvent::Enqueued { timestamp, .. } => *timestamp,
            BulkheadEvent::Rejected { timestamp, .. } => *timestamp,
            BulkheadEvent::Finished { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            BulkheadEvent::Permitted { pattern_name, .. } => pattern_name,
            BulkheadEvent::Enqueued { pattern_name, .. } => pattern_name,
            BulkheadEvent::Rejected { pattern_name, .. } => pattern_name,
            BulkheadEvent::Finished { pattern_name, .. } => pattern_name,
        }
    }
}
