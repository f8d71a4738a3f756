//! Test organization:
//! - ordering.rs: the fixed fallback ⊃ retry ⊃ breaker ⊃ bulkhead ⊃
//!   timeout nesting, observed from the outside
//! - pass_through.rs: unconfigured layers are structural no-ops

mod ordering;
