//! Shared helpers for the integration suite.
#![allow(dead_code)]

use palisade::{Category, Engine, FaultError, Taxonomy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Application error used across the suite, classified into two
/// categories under the fault root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Transient,
    Fatal,
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Transient => write!(f, "transient failure"),
            AppError::Fatal => write!(f, "fatal failure"),
        }
    }
}

impl std::error::Error for AppError {}

/// An engine plus the categories its taxonomy adds over the built-ins.
pub struct World {
    pub engine: Engine,
    pub transient: Category,
    pub fatal: Category,
}

pub fn world() -> World {
    let mut builder = Taxonomy::builder();
    let transient = builder.add("transient", &[Taxonomy::FAULT]);
    let fatal = builder.add("fatal", &[Taxonomy::FAULT]);
    World {
        engine: Engine::with_taxonomy(builder.build()),
        transient,
        fatal,
    }
}

impl World {
    /// The classifier every test policy installs.
    pub fn classifier(&self) -> impl Fn(&AppError) -> Category + Send + Sync + 'static {
        let transient = self.transient;
        let fatal = self.fatal;
        move |error: &AppError| match error {
            AppError::Transient => transient,
            AppError::Fatal => fatal,
        }
    }
}

/// A call counter shared with a target closure.
#[derive(Clone, Default)]
pub struct Calls(pub Arc<AtomicUsize>);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// Unwraps the application error out of a fault outcome.
pub fn app_error<R: std::fmt::Debug>(outcome: Result<R, FaultError<AppError>>) -> AppError {
    match outcome {
        Err(FaultError::Application(error)) => error,
        other => panic!("expected an application failure, got {:?}", other),
    }
}
