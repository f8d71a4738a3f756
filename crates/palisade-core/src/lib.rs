//! Core infrastructure for palisade.
//!
//! This crate provides shared functionality used across all palisade
//! middleware crates:
//! - Event system for observability
//! - The unified [`FaultError`] type composed layers report through
//! - The failure-category [`taxonomy`] used to classify outcomes

pub mod error;
pub mod events;
pub mod taxonomy;

pub use error::{DefinitionError, FaultError, Interrupted};
pub use events::{EventListener, EventListeners, FnListener, PatternEvent};
pub use taxonomy::{Category, CategorySet, Taxonomy, TaxonomyBuilder};
