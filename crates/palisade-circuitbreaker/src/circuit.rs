use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls pass through and outcomes are recorded.
    Closed = 0,
    /// Calls fail immediately without invoking the inner service.
    Open = 1,
    /// A limited number of trial calls probe recovery.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Point-in-time snapshot of the circuit breaker's internal state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state.
    pub state: CircuitState,
    /// Samples currently held in the rolling window.
    pub samples: usize,
    /// Failure samples in the rolling window.
    pub failure_count: usize,
    /// Failure fraction over the window (0.0 when empty).
    pub failure_rate: f64,
    /// Consecutive successful trial calls while half-open.
    pub trial_successes: usize,
    /// Time since the last state transition.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub time_since_transition: Duration,
}

/// An admission ticket handed out by [`Circuit::try_acquire`].
///
/// The epoch pins the state generation the attempt was admitted under; a
/// recording that arrives after a transition is stale and is dropped, so a
/// straggling attempt can never corrupt trial accounting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Permission {
    pub(crate) trial: bool,
    epoch: u64,
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_cell: Arc<AtomicU8>,
    epoch: u64,
    // Rolling outcome window, true = failure. Capacity is the request
    // volume threshold; the ratio is never evaluated before it fills.
    window: VecDeque<bool>,
    opened_at: Instant,
    last_transition: Instant,
    trial_successes: usize,
    trial_inflight: usize,
}

impl Circuit {
    pub(crate) fn new(state_cell: Arc<AtomicU8>) -> Self {
        Self {
            state: CircuitState::Closed,
            state_cell,
            epoch: 0,
            window: VecDeque::new(),
            opened_at: Instant::now(),
            last_transition: Instant::now(),
            trial_successes: 0,
            trial_inflight: 0,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        let samples = self.window.len();
        let failure_count = self.window.iter().filter(|failed| **failed).count();
        let failure_rate = if samples > 0 {
            failure_count as f64 / samples as f64
        } else {
            0.0
        };
        CircuitMetrics {
            state: self.state,
            samples,
            failure_count,
            failure_rate,
            trial_successes: self.trial_successes,
            time_since_transition: self.last_transition.elapsed(),
        }
    }

    /// Gate check. Returns a [`Permission`] when the call may proceed.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> Option<Permission> {
        match self.state {
            CircuitState::Closed => {
                self.emit_permitted(config);
                Some(Permission {
                    trial: false,
                    epoch: self.epoch,
                })
            }
            CircuitState::Open => {
                if self.opened_at.elapsed() >= config.delay {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.trial_inflight += 1;
                    self.emit_permitted(config);
                    Some(Permission {
                        trial: true,
                        epoch: self.epoch,
                    })
                } else {
                    self.emit_rejected(config);
                    None
                }
            }
            CircuitState::HalfOpen => {
                if self.trial_inflight + self.trial_successes < config.success_threshold {
                    self.trial_inflight += 1;
                    self.emit_permitted(config);
                    Some(Permission {
                        trial: true,
                        epoch: self.epoch,
                    })
                } else {
                    self.emit_rejected(config);
                    None
                }
            }
        }
    }

    /// Records one completed attempt's outcome.
    pub(crate) fn record(
        &mut self,
        permission: Permission,
        failure: bool,
        config: &CircuitBreakerConfig,
    ) {
        if permission.epoch != self.epoch {
            // The circuit transitioned while this attempt was in flight;
            // its sample belongs to a dead generation.
            return;
        }
        if permission.trial {
            self.trial_inflight = self.trial_inflight.saturating_sub(1);
        }

        let event = if failure {
            CircuitBreakerEvent::FailureRecorded {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                state: self.state,
            }
        } else {
            CircuitBreakerEvent::SuccessRecorded {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                state: self.state,
            }
        };
        config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            let outcome = if failure { "failure" } else { "success" };
            counter!("circuitbreaker_samples_total", "circuitbreaker" => config.name.clone(), "outcome" => outcome)
                .increment(1);
        }

        match self.state {
            CircuitState::HalfOpen => {
                if failure {
                    self.transition_to(CircuitState::Open, config);
                } else {
                    self.trial_successes += 1;
                    if self.trial_successes >= config.success_threshold {
                        self.transition_to(CircuitState::Closed, config);
                    }
                }
            }
            CircuitState::Closed => {
                self.window.push_back(failure);
                if self.window.len() > config.request_volume_threshold {
                    self.window.pop_front();
                }
                self.evaluate_window(config);
            }
            // No admissions happen while open, and stale generations were
            // filtered above.
            CircuitState::Open => {}
        }
    }

    /// An admitted attempt went away without producing an outcome
    /// (cancelled, or its classification said to discard the sample).
    pub(crate) fn abandon(&mut self, permission: Permission) {
        if permission.epoch != self.epoch {
            return;
        }
        if permission.trial {
            self.trial_inflight = self.trial_inflight.saturating_sub(1);
        }
    }

    pub(crate) fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Open, config);
    }

    pub(crate) fn force_closed(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
        self.window.clear();
    }

    fn evaluate_window(&mut self, config: &CircuitBreakerConfig) {
        if self.window.len() < config.request_volume_threshold {
            return;
        }
        let failures = self.window.iter().filter(|failed| **failed).count();
        let failure_rate = failures as f64 / self.window.len() as f64;
        if failure_rate >= config.failure_ratio {
            self.transition_to(CircuitState::Open, config);
        }
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }
        let from_state = self.state;

        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(
            breaker = %config.name,
            from = ?from_state,
            to = ?state,
            "circuit state transition"
        );

        #[cfg(feature = "metrics")]
        counter!(
            "circuitbreaker_transitions_total",
            "circuitbreaker" => config.name.clone(),
            "to" => match state {
                CircuitState::Closed => "closed",
                CircuitState::Open => "open",
                CircuitState::HalfOpen => "half_open",
            }
        )
        .increment(1);

        self.state = state;
        self.state_cell.store(state as u8, Ordering::Release);
        self.epoch += 1;
        self.last_transition = Instant::now();
        self.trial_successes = 0;
        self.trial_inflight = 0;
        match state {
            // Re-opening restarts the open timer.
            CircuitState::Open => self.opened_at = Instant::now(),
            // A recovered circuit starts with an empty window.
            CircuitState::Closed => self.window.clear(),
            CircuitState::HalfOpen => {}
        }
    }

    fn emit_permitted(&self, config: &CircuitBreakerConfig) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallPermitted {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                state: self.state,
            });
    }

    fn emit_rejected(&self, config: &CircuitBreakerConfig) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallRejected {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_rejected_total", "circuitbreaker" => config.name.clone())
            .increment(1);
    }
}
