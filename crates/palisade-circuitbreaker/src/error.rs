//! Error type for the circuit breaker middleware.

use palisade_core::FaultError;

/// The circuit was open (or half-open and at trial capacity); the inner
/// service was not invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("circuit breaker is open")]
pub struct OpenCircuitError;

impl<E> From<OpenCircuitError> for FaultError<E> {
    fn from(_: OpenCircuitError) -> Self {
        FaultError::CircuitOpen
    }
}
