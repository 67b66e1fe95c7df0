//! Wrapped operation values

use super::OperationId;
use crate::probe::Probe;
use std::fmt;
use std::sync::Arc;

/// Continuation passed to callback-style operations
pub type Callback<T> = Box<dyn FnOnce(T) + Send>;

type Original<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;
type Summarizer<A> = Arc<dyn Fn(&A) -> String + Send + Sync>;

/// A watched operation: the un-instrumented implementation plus, when the
/// subsystem is watched, the summarizer and the probe calls are recorded in.
///
/// Callback-style operations are hooks whose argument carries the
/// [`Callback`]; the call is recorded when it is made, not when the
/// continuation runs.
pub struct Hook<A, R> {
    operation: OperationId,
    original: Original<A, R>,
    tracking: Option<(Summarizer<A>, Arc<Probe>)>,
}

impl<A, R> Clone for Hook<A, R> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation,
            original: Arc::clone(&self.original),
            tracking: self.tracking.clone(),
        }
    }
}

impl<A, R> fmt::Debug for Hook<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("operation", &self.operation)
            .field("instrumented", &self.is_instrumented())
            .finish()
    }
}

impl<A, R> Hook<A, R> {
    pub(super) fn instrumented<F, S>(
        operation: OperationId,
        original: F,
        summarize: S,
        probe: Arc<Probe>,
    ) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
        S: Fn(&A) -> String + Send + Sync + 'static,
    {
        Self {
            operation,
            original: Arc::new(original),
            tracking: Some((Arc::new(summarize), probe)),
        }
    }

    pub(super) fn passthrough<F>(operation: OperationId, original: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self {
            operation,
            original: Arc::new(original),
            tracking: None,
        }
    }

    pub fn operation(&self) -> OperationId {
        self.operation
    }

    pub fn is_instrumented(&self) -> bool {
        self.tracking.is_some()
    }

    /// Record the call, then run the original with the same arguments and
    /// hand back whatever it returns
    pub fn call(&self, args: A) -> R {
        if let Some((summarize, probe)) = &self.tracking {
            probe.record_call(self.operation, &summarize(&args));
        }
        (self.original)(args)
    }
}
