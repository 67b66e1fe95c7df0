//! Shared watcher context
//!
//! A `Probe` owns everything the installed hooks write into: the
//! configuration snapshot, the resolver, the tracker and the dependency
//! tree. Hooks hold an `Arc<Probe>`; nothing is global. The tracker and the
//! tree sit behind a single lock so every record and tree mutation is
//! serialized, including after finalization.

use crate::config::Config;
use crate::dependency_tree::{DependencyTree, LoadEvent, Placement};
use crate::error::Result;
use crate::export::{Exporter, Sink};
use crate::filter::Subsystem;
use crate::intercept::catalog;
use crate::intercept::OperationId;
use crate::json_output::TreeDocument;
use crate::resolver::{Requester, ResolvedRequest, Resolver};
use crate::stats::{AggregatedSummary, AggregationMode};
use crate::tracker::{RecordOutcome, Tracker};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

#[derive(Debug)]
struct ProbeState {
    tracker: Tracker,
    tree: DependencyTree,
}

#[derive(Debug)]
pub struct Probe {
    config: Config,
    entry: PathBuf,
    resolver: Resolver,
    exporter: Exporter,
    state: Mutex<ProbeState>,
}

impl Probe {
    /// Build a probe for the process whose entry unit is `entry`
    pub fn new(config: Config, entry: impl Into<PathBuf>) -> Self {
        let entry = entry.into();
        let sink = Sink::from_output(config.output.as_deref());
        let exporter = Exporter::new(sink, config.structured);
        let state = ProbeState {
            tracker: Tracker::new(&config.modules, config.dependencies),
            tree: DependencyTree::new(config.dependencies),
        };
        Self {
            resolver: Resolver::new(&entry),
            entry,
            exporter,
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    fn state(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one call of `operation`.
    ///
    /// In live mode (`summary = false`) accepted calls are written to the
    /// sink immediately as `<operation> | <summary>` instead of being kept.
    /// A failing sink never fails the observed call.
    pub fn record_call(&self, operation: OperationId, summary: &str) -> RecordOutcome {
        if self.config.summary {
            let outcome = self.state().tracker.record(operation.subsystem, operation.name, summary);
            trace!(%operation, ?outcome, "record");
            return outcome;
        }

        let outcome = self.state().tracker.admit(operation.subsystem, summary);
        if outcome == RecordOutcome::Recorded {
            if let Err(e) = self.exporter.write_log(&format!("{} | {}", operation, summary)) {
                warn!(%operation, "failed to write live log line: {}", e);
            }
        }
        outcome
    }

    /// Resolve a load, place it in the dependency tree and record it.
    ///
    /// # Errors
    /// Resolution failures propagate; nothing is recorded for them.
    pub fn observe_load(
        &self,
        request: &str,
        requester: Option<&Requester>,
    ) -> Result<ResolvedRequest> {
        let resolved = self.resolver.resolve(request, requester)?;

        if let Some(requester) = requester {
            let mut state = self.state();
            if !state.tracker.is_finalized() {
                let placement = state.tree.submit(LoadEvent {
                    requester: &requester.id,
                    request,
                    resolved: &resolved.identity,
                    kind: resolved.kind,
                });
                if placement == Placement::Orphaned {
                    debug!(requester = %requester.id, request, "load left unplaced");
                }
            }
        }

        self.record_call(catalog::LOAD, &resolved.identity);
        Ok(resolved)
    }

    /// Raw summaries currently held for a key
    pub fn recorded(&self, subsystem: Subsystem, operation: Option<&str>) -> usize {
        self.state().tracker.recorded(subsystem, operation)
    }

    pub fn is_finalized(&self) -> bool {
        self.state().tracker.is_finalized()
    }

    /// Snapshot of the dependency tree
    pub fn tree(&self) -> DependencyTree {
        self.state().tree.clone()
    }

    /// Collapse the recorded calls and freeze the tree.
    ///
    /// # Errors
    /// `VigiaError::AlreadyFinalized` on every call after the first.
    pub fn finalize(&self) -> Result<(AggregatedSummary, TreeDocument)> {
        let mut state = self.state();
        let mode = AggregationMode::from_frequency_flag(self.config.frequency);
        let summary = state.tracker.finalize(mode)?;
        let document = state.tree.to_document(&self.entry.to_string_lossy());
        debug!(nodes = state.tree.len(), ?mode, "finalized");
        Ok((summary, document))
    }
}
