//! Test organization:
//! - thresholds.rs: rolling-window evaluation and fail-fast behavior
//! - half_open.rs: recovery probing
//! - sharing.rs: per-call-site state sharing through the registry

mod sharing;
mod thresholds;
