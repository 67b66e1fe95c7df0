//! Raw call recording
//!
//! The tracker keeps one ordered sequence of argument summaries per
//! `(subsystem, operation)` key until finalization collapses them.

use crate::error::{Result, VigiaError};
use crate::filter::{Subsystem, SubsystemFilter};
use crate::resolver::PACKAGES_DIR;
use crate::stats::{AggregatedSummary, AggregationMode, SubsystemSummary};
use std::collections::BTreeMap;

/// What happened to a recorded call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// The subsystem is not watched
    Disabled,
    /// Storage call attributed to a vendored third-party unit while
    /// dependency detail is off
    Suppressed,
    /// Arrived after finalization
    Finalized,
}

#[derive(Debug, Clone)]
enum RecordSet {
    Flat(Vec<String>),
    ByOperation(BTreeMap<String, Vec<String>>),
}

/// Per-key ordered call summaries for the enabled subsystems
#[derive(Debug)]
pub struct Tracker {
    records: BTreeMap<Subsystem, RecordSet>,
    keep_dependencies: bool,
    finalized: bool,
}

impl Tracker {
    /// Create a tracker with an empty record set for every enabled subsystem
    pub fn new(filter: &SubsystemFilter, keep_dependencies: bool) -> Self {
        let records = filter
            .iter()
            .map(|subsystem| {
                let set = if subsystem.has_operations() {
                    RecordSet::ByOperation(BTreeMap::new())
                } else {
                    RecordSet::Flat(Vec::new())
                };
                (subsystem, set)
            })
            .collect();
        Self {
            records,
            keep_dependencies,
            finalized: false,
        }
    }

    /// Decide whether a call would be kept, without storing it
    pub fn admit(&self, subsystem: Subsystem, summary: &str) -> RecordOutcome {
        if self.finalized {
            RecordOutcome::Finalized
        } else if !self.records.contains_key(&subsystem) {
            RecordOutcome::Disabled
        } else if !self.keep_dependencies
            && subsystem == Subsystem::Storage
            && is_vendored(summary)
        {
            RecordOutcome::Suppressed
        } else {
            RecordOutcome::Recorded
        }
    }

    /// Append `summary` to the sequence of `(subsystem, operation)`.
    ///
    /// Module loads keep one flat sequence and ignore `operation`. An
    /// operation-keyed subsystem called without an operation records under
    /// its own key.
    pub fn record(
        &mut self,
        subsystem: Subsystem,
        operation: Option<&str>,
        summary: &str,
    ) -> RecordOutcome {
        let outcome = self.admit(subsystem, summary);
        if outcome != RecordOutcome::Recorded {
            return outcome;
        }
        match self.records.get_mut(&subsystem) {
            Some(RecordSet::Flat(values)) => values.push(summary.to_string()),
            Some(RecordSet::ByOperation(ops)) => ops
                .entry(operation.unwrap_or(subsystem.key()).to_string())
                .or_default()
                .push(summary.to_string()),
            None => return RecordOutcome::Disabled,
        }
        outcome
    }

    /// Number of raw summaries currently held for a key
    pub fn recorded(&self, subsystem: Subsystem, operation: Option<&str>) -> usize {
        match (self.records.get(&subsystem), operation) {
            (Some(RecordSet::Flat(values)), _) => values.len(),
            (Some(RecordSet::ByOperation(ops)), Some(op)) => ops.get(op).map_or(0, Vec::len),
            _ => 0,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Collapse every sequence once. Later calls fail and later records are dropped.
    pub fn finalize(&mut self, mode: AggregationMode) -> Result<AggregatedSummary> {
        if self.finalized {
            return Err(VigiaError::AlreadyFinalized);
        }
        self.finalized = true;

        let entries = std::mem::take(&mut self.records)
            .into_iter()
            .map(|(subsystem, set)| {
                let summary = match set {
                    RecordSet::Flat(values) => SubsystemSummary::Flat(mode.aggregate(values)),
                    RecordSet::ByOperation(ops) => SubsystemSummary::ByOperation(
                        ops.into_iter()
                            .map(|(op, values)| (op, mode.aggregate(values)))
                            .collect(),
                    ),
                };
                (subsystem, summary)
            })
            .collect();
        Ok(AggregatedSummary::new(entries))
    }
}

/// Substring heuristic for calls attributable to vendored packages
pub fn is_vendored(summary: &str) -> bool {
    summary.contains(PACKAGES_DIR)
}
