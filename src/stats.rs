//! Aggregation of recorded call summaries
//!
//! At shutdown every recorded sequence collapses into either its ordered
//! set of unique values (dedup mode) or a value → occurrence count map
//! (frequency mode).

use crate::filter::Subsystem;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// How recorded sequences are collapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// Keep each distinct summary once, in first-observed order
    Dedup,
    /// Count occurrences of each distinct summary
    Frequency,
}

impl AggregationMode {
    pub fn from_frequency_flag(frequency: bool) -> Self {
        if frequency {
            AggregationMode::Frequency
        } else {
            AggregationMode::Dedup
        }
    }

    /// Collapse one recorded sequence
    pub fn aggregate(self, values: Vec<String>) -> Aggregated {
        match self {
            AggregationMode::Dedup => Aggregated::Unique(unique_in_order(values)),
            AggregationMode::Frequency => Aggregated::Counts(frequency_count(values)),
        }
    }
}

/// Aggregated values of one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Aggregated {
    Unique(Vec<String>),
    Counts(BTreeMap<String, u64>),
}

impl Aggregated {
    /// Number of distinct summaries
    pub fn distinct(&self) -> usize {
        match self {
            Aggregated::Unique(values) => values.len(),
            Aggregated::Counts(counts) => counts.len(),
        }
    }

    /// Number of calls represented, when counts are available
    pub fn total_calls(&self) -> Option<u64> {
        match self {
            Aggregated::Unique(_) => None,
            Aggregated::Counts(counts) => Some(counts.values().sum()),
        }
    }

    pub fn count_of(&self, summary: &str) -> Option<u64> {
        match self {
            Aggregated::Unique(values) => Some(values.iter().any(|v| v == summary) as u64),
            Aggregated::Counts(counts) => Some(counts.get(summary).copied().unwrap_or(0)),
        }
    }
}

/// Aggregated values of one subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SubsystemSummary {
    /// Subsystems without operation names (module loads)
    Flat(Aggregated),
    ByOperation(BTreeMap<String, Aggregated>),
}

/// Write-once result of finalization, keyed by subsystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AggregatedSummary {
    entries: BTreeMap<Subsystem, SubsystemSummary>,
}

impl AggregatedSummary {
    pub(crate) fn new(entries: BTreeMap<Subsystem, SubsystemSummary>) -> Self {
        Self { entries }
    }

    pub fn subsystem(&self, subsystem: Subsystem) -> Option<&SubsystemSummary> {
        self.entries.get(&subsystem)
    }

    /// Aggregated values for `(subsystem, operation)`; `operation` is ignored
    /// for flat subsystems
    pub fn get(&self, subsystem: Subsystem, operation: Option<&str>) -> Option<&Aggregated> {
        match (self.entries.get(&subsystem)?, operation) {
            (SubsystemSummary::Flat(values), _) => Some(values),
            (SubsystemSummary::ByOperation(ops), Some(op)) => ops.get(op),
            (SubsystemSummary::ByOperation(_), None) => None,
        }
    }

    pub fn subsystems(&self) -> impl Iterator<Item = Subsystem> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

fn unique_in_order(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

fn frequency_count(values: Vec<String>) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_keeps_first_observed_order() {
        let result = AggregationMode::Dedup.aggregate(strings(&["b", "a", "b", "c", "a"]));
        assert_eq!(result, Aggregated::Unique(strings(&["b", "a", "c"])));
        assert_eq!(result.distinct(), 3);
        assert_eq!(result.total_calls(), None);
    }

    #[test]
    fn test_frequency_counts() {
        let values = strings(&["./a.txt", "./a.txt", "./b.txt"]);
        let result = AggregationMode::Frequency.aggregate(values);
        assert_eq!(result.count_of("./a.txt"), Some(2));
        assert_eq!(result.count_of("./b.txt"), Some(1));
        assert_eq!(result.count_of("./c.txt"), Some(0));
        assert_eq!(result.total_calls(), Some(3));
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(AggregationMode::Dedup.aggregate(vec![]), Aggregated::Unique(vec![]));
        assert_eq!(AggregationMode::Frequency.aggregate(vec![]).distinct(), 0);
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(AggregationMode::from_frequency_flag(true), AggregationMode::Frequency);
        assert_eq!(AggregationMode::from_frequency_flag(false), AggregationMode::Dedup);
    }

    #[test]
    fn test_summary_serialization_shape() {
        let mut ops = BTreeMap::new();
        ops.insert("read".to_string(), AggregationMode::Dedup.aggregate(strings(&["./a.txt"])));
        let mut entries = BTreeMap::new();
        entries.insert(Subsystem::Storage, SubsystemSummary::ByOperation(ops));
        entries.insert(
            Subsystem::ModuleLoad,
            SubsystemSummary::Flat(AggregationMode::Dedup.aggregate(strings(&["/app/a.js"]))),
        );
        let summary = AggregatedSummary::new(entries);

        assert_eq!(
            summary.to_value().unwrap(),
            json!({"fs": {"read": ["./a.txt"]}, "require": ["/app/a.js"]})
        );
        assert!(summary.get(Subsystem::Storage, Some("read")).is_some());
        assert!(summary.get(Subsystem::Storage, None).is_none());
        assert!(summary.get(Subsystem::ModuleLoad, None).is_some());
    }
}
