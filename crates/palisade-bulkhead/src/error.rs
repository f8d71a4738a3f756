//! Error types for the bulkhead middleware.

use palisade_core::FaultError;

/// Errors produced by bulkhead admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BulkheadError {
    /// Admission was refused: every execution slot (and, in queued mode,
    /// every queue slot) is taken.
    #[error("bulkhead full: {capacity} concurrent executions reached")]
    Full {
        /// Maximum concurrent executions permitted.
        capacity: usize,
    },

    /// The invocation was cancelled while waiting in the queue.
    #[error("cancelled while waiting for a bulkhead slot")]
    Interrupted,
}

impl<E> From<BulkheadError> for FaultError<E> {
    fn from(err: BulkheadError) -> Self {
        match err {
            BulkheadError::Full { capacity } => FaultError::BulkheadFull { capacity },
            BulkheadError::Interrupted => FaultError::Cancelled,
        }
    }
}
