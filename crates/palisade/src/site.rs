//! Call-site identity and the shared-state registry.
//!
//! Circuit breakers and bulkheads are shared by call site, not by chain
//! instance: every chain built for the same [`SiteKey`] admits against the
//! same state. Keys are resolved once by the caller (the owner after any
//! override resolution, plus the method signature); the registry never
//! inspects types at call time.

use palisade_bulkhead::BulkheadHandle;
use palisade_circuitbreaker::CircuitHandle;
use palisade_core::DefinitionError;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

/// Stable identity of one guarded call site.
///
/// The owner is the type that defines the guarded operation after
/// override resolution: an overriding method redefines the site, an
/// inherited one shares the defining type's site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteKey {
    owner: Arc<str>,
    method: Arc<str>,
}

impl SiteKey {
    /// Creates a key from an owner type name and a method signature.
    pub fn new(owner: impl AsRef<str>, method: impl AsRef<str>) -> Self {
        Self {
            owner: Arc::from(owner.as_ref()),
            method: Arc::from(method.as_ref()),
        }
    }

    /// The owning type name.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The method signature.
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.method)
    }
}

/// Lazily-built shared state for one call site.
#[derive(Default)]
pub(crate) struct SiteState {
    circuit: OnceLock<CircuitHandle>,
    bulkhead: OnceLock<BulkheadHandle>,
}

impl SiteState {
    pub(crate) fn circuit(&self) -> Option<CircuitHandle> {
        self.circuit.get().cloned()
    }

    pub(crate) fn bulkhead(&self) -> Option<BulkheadHandle> {
        self.bulkhead.get().cloned()
    }

    pub(crate) fn circuit_or_init(
        &self,
        build: impl FnOnce() -> Result<CircuitHandle, DefinitionError>,
    ) -> Result<CircuitHandle, DefinitionError> {
        if let Some(handle) = self.circuit.get() {
            return Ok(handle.clone());
        }
        // Racing builders are possible; the loser's handle is discarded
        // before any chain admits through it.
        let built = build()?;
        Ok(self.circuit.get_or_init(|| built).clone())
    }

    pub(crate) fn bulkhead_or_init(
        &self,
        build: impl FnOnce() -> Result<BulkheadHandle, DefinitionError>,
    ) -> Result<BulkheadHandle, DefinitionError> {
        if let Some(handle) = self.bulkhead.get() {
            return Ok(handle.clone());
        }
        let built = build()?;
        Ok(self.bulkhead.get_or_init(|| built).clone())
    }
}

/// Process-wide map from call-site key to shared state.
#[derive(Default)]
pub(crate) struct SiteRegistry {
    sites: RwLock<HashMap<SiteKey, Arc<SiteState>>>,
}

impl SiteRegistry {
    // Recover a poisoned map; entries are Arc'd and stay coherent.
    pub(crate) fn state(&self, key: &SiteKey) -> Arc<SiteState> {
        let sites = match self.sites.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(state) = sites.get(key) {
            return Arc::clone(state);
        }
        drop(sites);

        let mut sites = match self.sites.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(sites.entry(key.clone()).or_default())
    }

    pub(crate) fn get(&self, key: &SiteKey) -> Option<Arc<SiteState>> {
        let sites = match self.sites.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sites.get(key).map(Arc::clone)
    }
}
