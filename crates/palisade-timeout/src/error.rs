//! Error type for the timeout middleware.

use palisade_core::FaultError;
use std::time::Duration;

/// The deadline elapsed before the inner call produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {after:?}")]
pub struct TimeoutError {
    /// The configured deadline.
    pub after: Duration,
}

impl<E> From<TimeoutError> for FaultError<E> {
    fn from(err: TimeoutError) -> Self {
        FaultError::Timeout { after: err.after }
    }
}
