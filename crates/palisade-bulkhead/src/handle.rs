//! Shared bulkhead state.
//!
//! A [`BulkheadHandle`] owns the admission gate for one call site. It is
//! cheap to clone; every clone admits against the same permits, which is
//! how multiple chains guarding the same call site share one limiter.

use crate::config::BulkheadMode;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;
use palisade_core::EventListeners;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

struct QueueSlots {
    slots: Arc<Semaphore>,
    size: usize,
}

struct HandleInner {
    permits: Arc<Semaphore>,
    capacity: usize,
    queue: Option<QueueSlots>,
    name: String,
    event_listeners: EventListeners<BulkheadEvent>,
}

/// Shared, cloneable admission gate for one call site.
#[derive(Clone)]
pub struct BulkheadHandle {
    inner: Arc<HandleInner>,
}

impl BulkheadHandle {
    pub(crate) fn new(
        capacity: usize,
        mode: BulkheadMode,
        name: String,
        event_listeners: EventListeners<BulkheadEvent>,
    ) -> Self {
        let queue = match mode {
            BulkheadMode::Semaphore => None,
            BulkheadMode::Queued { wait_queue_size } => Some(QueueSlots {
                slots: Arc::new(Semaphore::new(wait_queue_size)),
                size: wait_queue_size,
            }),
        };
        Self {
            inner: Arc::new(HandleInner {
                permits: Arc::new(Semaphore::new(capacity)),
                capacity,
                queue,
                name,
                event_listeners,
            }),
        }
    }

    /// Maximum concurrent executions.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Executions currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.inner.capacity - self.inner.permits.available_permits()
    }

    /// Invocations currently parked in the wait queue.
    pub fn queued(&self) -> usize {
        match &self.inner.queue {
            Some(q) => q.size - q.slots.available_permits(),
            None => 0,
        }
    }

    /// Admits one execution, or refuses immediately.
    ///
    /// Semaphore mode never suspends: either a permit is free or the call
    /// is rejected. Queued mode parks up to `wait_queue_size` invocations
    /// and dispatches them in FIFO order as slots free up; the wait also
    /// resolves if `cancel` fires, releasing the queue slot synchronously.
    pub(crate) async fn admit(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<OwnedSemaphorePermit, BulkheadError> {
        let full = BulkheadError::Full {
            capacity: self.inner.capacity,
        };

        if let Ok(permit) = Arc::clone(&self.inner.permits).try_acquire_owned() {
            self.emit_permitted();
            return Ok(permit);
        }

        let Some(queue) = &self.inner.queue else {
            self.emit_rejected();
            return Err(full);
        };
        let Ok(slot) = Arc::clone(&queue.slots).try_acquire_owned() else {
            self.emit_rejected();
            return Err(full);
        };

        self.inner.event_listeners.emit(&BulkheadEvent::Enqueued {
            pattern_name: self.inner.name.clone(),
            timestamp: Instant::now(),
        });

        #[cfg(feature = "metrics")]
        counter!("bulkhead_calls_enqueued_total", "bulkhead" => self.inner.name.clone())
            .increment(1);

        let acquired = match cancel {
            Some(token) => tokio::select! {
                permit = Arc::clone(&self.inner.permits).acquire_owned() => permit,
                _ = token.cancelled() => {
                    drop(slot);
                    return Err(BulkheadError::Interrupted);
                }
            },
            None => Arc::clone(&self.inner.permits).acquire_owned().await,
        };
        drop(slot);

        match acquired {
            Ok(permit) => {
                self.emit_permitted();
                Ok(permit)
            }
            // The semaphore is never closed; treat a closed gate as full.
            Err(_) => {
                self.emit_rejected();
                Err(full)
            }
        }
    }

    pub(crate) fn emit_finished(&self, duration: std::time::Duration, succeeded: bool) {
        self.inner.event_listeners.emit(&BulkheadEvent::Finished {
            pattern_name: self.inner.name.clone(),
            timestamp: Instant::now(),
            duration,
            succeeded,
        });

        #[cfg(feature = "metrics")]
        {
            let outcome = if succeeded { "success" } else { "error" };
            counter!("bulkhead_calls_finished_total", "bulkhead" => self.inner.name.clone(), "outcome" => outcome)
                .increment(1);
            gauge!("bulkhead_in_flight", "bulkhead" => self.inner.name.clone())
                .set(self.in_flight() as f64);
        }
    }

    fn emit_permitted(&self) {
        self.inner.event_listeners.emit(&BulkheadEvent::Permitted {
            pattern_name: self.inner.name.clone(),
            timestamp: Instant::now(),
            in_flight: self.in_flight(),
        });

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_permitted_total", "bulkhead" => self.inner.name.clone())
                .increment(1);
            gauge!("bulkhead_in_flight", "bulkhead" => self.inner.name.clone())
                .set(self.in_flight() as f64);
        }
    }

    fn emit_rejected(&self) {
        self.inner.event_listeners.emit(&BulkheadEvent::Rejected {
            pattern_name: self.inner.name.clone(),
            timestamp: Instant::now(),
            capacity: self.inner.capacity,
        });

        #[cfg(feature = "metrics")]
        counter!("bulkhead_calls_rejected_total", "bulkhead" => self.inner.name.clone())
            .increment(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(bulkhead = %self.inner.name, "admission refused");
    }
}
