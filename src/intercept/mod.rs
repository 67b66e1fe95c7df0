//! Interception registry
//!
//! The registry is the instrumentation table: operation identity -> installed
//! hook. A hook is a value object holding the un-instrumented implementation
//! handle supplied by the caller plus the argument summarizer. Installing the
//! same operation twice hands back the first hook instead of wrapping again,
//! and operations of unwatched subsystems come back as plain passthroughs.

pub mod catalog;
mod hook;
mod loader;

pub use hook::{Callback, Hook};
pub use loader::Loader;

use crate::error::{Result, VigiaError};
use crate::filter::Subsystem;
use crate::probe::Probe;
use crate::resolver::Requester;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Qualified name of a watched operation, e.g. `fs.read`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId {
    pub subsystem: Subsystem,
    /// `None` for subsystems recorded as one flat sequence
    pub name: Option<&'static str>,
}

impl OperationId {
    pub const fn new(subsystem: Subsystem, name: &'static str) -> Self {
        Self {
            subsystem,
            name: Some(name),
        }
    }

    pub const fn flat(subsystem: Subsystem) -> Self {
        Self {
            subsystem,
            name: None,
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "{}.{}", self.subsystem, name),
            None => write!(f, "{}", self.subsystem),
        }
    }
}

/// Table of installed hooks, shared by everything built from one session
pub struct Registry {
    probe: Arc<Probe>,
    installed: Mutex<HashMap<OperationId, Box<dyn Any + Send + Sync>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("installed", &self.installed())
            .finish()
    }
}

impl Registry {
    pub fn new(probe: Arc<Probe>) -> Self {
        Self {
            probe,
            installed: Mutex::new(HashMap::new()),
        }
    }

    fn watches(&self, subsystem: Subsystem) -> bool {
        self.probe.config().modules.should_watch(subsystem)
    }

    /// Wrap `original` so every call records `summarize(&args)` under
    /// `operation` before delegating.
    ///
    /// # Errors
    /// `VigiaError::Install` if `operation` was already installed with a
    /// different signature.
    pub fn install<A, R, F, S>(
        &self,
        operation: OperationId,
        original: F,
        summarize: S,
    ) -> Result<Hook<A, R>>
    where
        A: 'static,
        R: 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
        S: Fn(&A) -> String + Send + Sync + 'static,
    {
        if !self.watches(operation.subsystem) {
            return Ok(Hook::passthrough(operation, original));
        }
        self.install_with(operation, || {
            Hook::instrumented(operation, original, summarize, Arc::clone(&self.probe))
        })
    }

    /// Wrap the module load primitive. Loads resolve the request, feed the
    /// dependency tree, and record the resolved identity before delegating.
    pub fn install_loader<R, F>(&self, original: F) -> Result<Loader<R>>
    where
        R: 'static,
        F: Fn(&str, Option<&Requester>) -> R + Send + Sync + 'static,
    {
        let operation = catalog::LOAD;
        if !self.watches(operation.subsystem) {
            return Ok(Loader::passthrough(original));
        }
        self.install_with(operation, || {
            Loader::instrumented(original, Arc::clone(&self.probe))
        })
    }

    fn install_with<H, B>(&self, operation: OperationId, build: B) -> Result<H>
    where
        H: Clone + Send + Sync + 'static,
        B: FnOnce() -> H,
    {
        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = installed.get(&operation) {
            debug!(%operation, "already instrumented, reusing hook");
            return existing.downcast_ref::<H>().cloned().ok_or_else(|| {
                VigiaError::Install(format!(
                    "{} is already installed with a different signature",
                    operation
                ))
            });
        }
        let hook = build();
        installed.insert(operation, Box::new(hook.clone()));
        debug!(%operation, "installed wrapper");
        Ok(hook)
    }

    pub fn is_installed(&self, operation: OperationId) -> bool {
        self.installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&operation)
    }

    /// Installed operations, sorted
    pub fn installed(&self) -> Vec<OperationId> {
        let mut ops: Vec<_> = self
            .installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ops.sort();
        ops
    }
}
