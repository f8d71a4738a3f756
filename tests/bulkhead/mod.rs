//! Test organization:
//! - admission.rs: fail-fast semaphore admission and permit release
//! - queued.rs: FIFO wait-queue mode

mod admission;
mod queued;
