//! Instrumented module loading

use crate::error::Result;
use crate::probe::Probe;
use crate::resolver::Requester;
use std::fmt;
use std::sync::Arc;

type LoadFn<R> = Arc<dyn Fn(&str, Option<&Requester>) -> R + Send + Sync>;

/// The module load primitive, optionally instrumented
///
/// An instrumented load resolves the request first. A resolution failure
/// is returned to the caller and the original loader is not invoked.
pub struct Loader<R> {
    original: LoadFn<R>,
    probe: Option<Arc<Probe>>,
}

impl<R> Clone for Loader<R> {
    fn clone(&self) -> Self {
        Self {
            original: Arc::clone(&self.original),
            probe: self.probe.clone(),
        }
    }
}

impl<R> fmt::Debug for Loader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("instrumented", &self.is_instrumented())
            .finish()
    }
}

impl<R> Loader<R> {
    pub(super) fn instrumented<F>(original: F, probe: Arc<Probe>) -> Self
    where
        F: Fn(&str, Option<&Requester>) -> R + Send + Sync + 'static,
    {
        Self {
            original: Arc::new(original),
            probe: Some(probe),
        }
    }

    pub(super) fn passthrough<F>(original: F) -> Self
    where
        F: Fn(&str, Option<&Requester>) -> R + Send + Sync + 'static,
    {
        Self {
            original: Arc::new(original),
            probe: None,
        }
    }

    pub fn is_instrumented(&self) -> bool {
        self.probe.is_some()
    }

    /// Load `request` on behalf of `requester`
    ///
    /// # Errors
    /// `VigiaError::Resolution` when the request names a package that cannot
    /// be found; the original loader is not called in that case.
    pub fn load(&self, request: &str, requester: Option<&Requester>) -> Result<R> {
        if let Some(probe) = &self.probe {
            probe.observe_load(request, requester)?;
        }
        Ok((self.original)(request, requester))
    }
}
