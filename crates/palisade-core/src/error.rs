//! Unified error types shared by every palisade layer.
//!
//! Composing several resilience layers around one target normally forces the
//! application to write `From` conversions between each layer's error type.
//! [`FaultError<E>`] avoids that: every layer's synthetic failure converts
//! into one of its variants, and the target's own error is preserved in
//! [`FaultError::Application`].
//!
//! ```rust
//! use palisade_core::FaultError;
//!
//! #[derive(Debug, Clone)]
//! enum AppError {
//!     DatabaseDown,
//! }
//!
//! fn handle(err: FaultError<AppError>) {
//!     match err {
//!         FaultError::Timeout { after } => eprintln!("timed out after {:?}", after),
//!         FaultError::CircuitOpen => eprintln!("circuit open, not attempted"),
//!         FaultError::BulkheadFull { capacity } => eprintln!("over {} in flight", capacity),
//!         FaultError::Cancelled => eprintln!("caller cancelled"),
//!         FaultError::Application(e) => eprintln!("application error: {:?}", e),
//!     }
//! }
//! ```
//!
//! The `From` implementations for each layer's concrete error live in the
//! individual middleware crates to avoid circular dependencies.

use std::fmt;
use std::time::Duration;

/// The terminal failure of one guarded invocation.
///
/// Synthetic variants (`CircuitOpen`, `BulkheadFull`, `Timeout`) are
/// generated by the engine, not by the target; they are classified and fed
/// to retry and fallback evaluation exactly like application failures.
/// `Cancelled` is caller-initiated and deliberately classified outside the
/// fault hierarchy so category-driven retry and fallback never fire for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultError<E> {
    /// The target itself failed; the original cause is preserved.
    Application(E),

    /// The circuit breaker was open; the target was not invoked.
    CircuitOpen,

    /// The bulkhead refused admission; the target was not invoked.
    BulkheadFull {
        /// Maximum concurrent executions permitted for this call site.
        capacity: usize,
    },

    /// The deadline elapsed before the target produced an outcome.
    Timeout {
        /// The configured deadline.
        after: Duration,
    },

    /// The invocation was cancelled by its caller.
    Cancelled,
}

impl<E> fmt::Display for FaultError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultError::Application(e) => write!(f, "application error: {}", e),
            FaultError::CircuitOpen => write!(f, "circuit breaker is open"),
            FaultError::BulkheadFull { capacity } => {
                write!(f, "bulkhead full ({} concurrent executions)", capacity)
            }
            FaultError::Timeout { after } => write!(f, "timed out after {:?}", after),
            FaultError::Cancelled => write!(f, "invocation cancelled"),
        }
    }
}

impl<E> std::error::Error for FaultError<E> where E: std::error::Error {}

impl<E> FaultError<E> {
    /// Returns `true` if the deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FaultError::Timeout { .. })
    }

    /// Returns `true` if the circuit breaker rejected the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, FaultError::CircuitOpen)
    }

    /// Returns `true` if the bulkhead refused admission.
    pub fn is_bulkhead_full(&self) -> bool {
        matches!(self, FaultError::BulkheadFull { .. })
    }

    /// Returns `true` if the invocation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FaultError::Cancelled)
    }

    /// Returns `true` if the target itself failed.
    pub fn is_application(&self) -> bool {
        matches!(self, FaultError::Application(_))
    }

    /// Extracts the application error, if any.
    pub fn application_error(self) -> Option<E> {
        match self {
            FaultError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the application error using a function.
    pub fn map_application<F, T>(self, f: F) -> FaultError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            FaultError::Application(e) => FaultError::Application(f(e)),
            FaultError::CircuitOpen => FaultError::CircuitOpen,
            FaultError::BulkheadFull { capacity } => FaultError::BulkheadFull { capacity },
            FaultError::Timeout { after } => FaultError::Timeout { after },
            FaultError::Cancelled => FaultError::Cancelled,
        }
    }
}

/// Raised by a suspension point when the invocation's cancellation token
/// fires while it is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invocation cancelled")]
pub struct Interrupted;

impl<E> From<Interrupted> for FaultError<E> {
    fn from(_: Interrupted) -> Self {
        FaultError::Cancelled
    }
}

/// A policy was misconfigured.
///
/// Definition errors are raised eagerly when a guarded call is set up.
/// They are fatal to that call site and are never retried or recovered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    /// `delay` must not exceed `max_duration` when both are configured.
    #[error("retry delay {delay:?} exceeds max duration {max_duration:?}")]
    DelayExceedsMaxDuration {
        /// The configured inter-attempt delay.
        delay: Duration,
        /// The configured overall retry budget.
        max_duration: Duration,
    },

    /// `max_retries` below −1 has no meaning.
    #[error("max retries must be >= -1, got {0}")]
    InvalidMaxRetries(i64),

    /// `jitter_factor` must lie in `[0, 1]`.
    #[error("jitter factor must be within [0, 1], got {0}")]
    JitterFactorOutOfRange(f64),

    /// `failure_ratio` must lie in `[0, 1]`.
    #[error("failure ratio must be within [0, 1], got {0}")]
    FailureRatioOutOfRange(f64),

    /// The rolling window needs at least one sample.
    #[error("request volume threshold must be >= 1")]
    ZeroRequestVolumeThreshold,

    /// Half-open recovery needs at least one trial success.
    #[error("success threshold must be >= 1")]
    ZeroSuccessThreshold,

    /// A bulkhead must admit at least one execution.
    #[error("bulkhead capacity must be >= 1")]
    ZeroBulkheadCapacity,

    /// At most one fallback mechanism may be configured per call site.
    #[error("conflicting fallback configuration: at most one of handler/method may be set")]
    ConflictingFallback,

    /// A fallback layer was built without any strategy.
    #[error("no fallback strategy configured")]
    MissingFallback,

    /// A category referenced a taxonomy it was not created from.
    #[error("category index {index} is not part of this taxonomy")]
    UnknownCategory {
        /// The out-of-range category index.
        index: usize,
    },
}
