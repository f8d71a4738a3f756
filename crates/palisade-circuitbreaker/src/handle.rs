//! Shared circuit state.
//!
//! A [`CircuitHandle`] owns the state machine for one call site. Clones
//! share the same circuit, which is how every chain guarding a call site
//! sees one breaker. The handle also carries the administrative surface
//! (reset, forced transitions, inspection), none of which is reachable
//! from inside a chain.

use crate::circuit::{Circuit, CircuitMetrics, CircuitState, Permission};
use crate::config::CircuitBreakerConfig;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared, cloneable circuit state for one call site.
#[derive(Clone)]
pub struct CircuitHandle {
    circuit: Arc<Mutex<Circuit>>,
    state_cell: Arc<AtomicU8>,
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitHandle {
    pub(crate) fn new(config: CircuitBreakerConfig) -> Self {
        let state_cell = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            circuit: Arc::new(Mutex::new(Circuit::new(Arc::clone(&state_cell)))),
            state_cell,
            config: Arc::new(config),
        }
    }

    // All circuit mutations go through this narrow critical section; a
    // poisoned lock is recovered since the state machine stays coherent
    // between method calls.
    fn lock(&self) -> MutexGuard<'_, Circuit> {
        match self.circuit.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The current state, read lock-free.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_cell.load(Ordering::Acquire))
    }

    /// Returns whether the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// A snapshot of the circuit's internal counters.
    pub fn metrics(&self) -> CircuitMetrics {
        self.lock().metrics()
    }

    /// Administrative reset to the closed state, clearing the window.
    pub fn reset(&self) {
        self.lock().reset(&self.config);
    }

    /// Forces the circuit open.
    pub fn force_open(&self) {
        self.lock().force_open(&self.config);
    }

    /// Forces the circuit closed.
    pub fn force_closed(&self) {
        self.lock().force_closed(&self.config);
    }

    pub(crate) fn try_acquire(&self) -> Option<Permission> {
        self.lock().try_acquire(&self.config)
    }

    pub(crate) fn record(&self, permission: Permission, failure: bool) {
        self.lock().record(permission, failure, &self.config);
    }

    pub(crate) fn abandon(&self, permission: Permission) {
        self.lock().abandon(permission);
    }
}
