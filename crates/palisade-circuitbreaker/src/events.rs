//! Events emitted by the circuit breaker.

use crate::circuit::CircuitState;
use palisade_core::PatternEvent;
use std::time::Instant;

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The circuit moved between states.
    StateTransition {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// State before the transition.
        from_state: CircuitState,
        /// State after the transition.
        to_state: CircuitState,
    },
    /// A call was allowed through the gate.
    CallPermitted {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// State at admission time.
        state: CircuitState,
    },
    /// A call was rejected without reaching the inner service.
    CallRejected {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
    },
    /// A completed attempt was recorded as a success sample.
    SuccessRecorded {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// State at recording time.
        state: CircuitState,
    },
    /// A completed attempt was recorded as a failure sample.
    FailureRecorded {
        /// Name of the emitting instance.
        pattern_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// State at recording time.
        state: CircuitState,
    },
}

impl PatternEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. } => *timestamp,
            CircuitBreakerEvent::CallPermitted { timestamp, .. } => *timestamp,
            CircuitBreakerEvent::CallRejected { timestamp, .. } => *timestamp,
            CircuitBreakerEvent::SuccessRecorded { timestamp, .. } => *timestamp,
            CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { pattern_name, .. } => pattern_name,
            CircuitBreakerEvent::CallPermitted { pattern_name, .. } => pattern_name,
            CircuitBreakerEvent::CallRejected { pattern_name, .. } => pattern_name,
            CircuitBreakerEvent::SuccessRecorded { pattern_name, .. } => pattern_name,
            CircuitBreakerEvent::FailureRecorded { pattern_name, .. } => pattern_name,
        }
    }
}
