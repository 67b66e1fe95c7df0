//! Property-based tests for aggregation and tree invariants

use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use vigia::dependency_tree::{DependencyTree, LoadEvent, Placement};
use vigia::filter::SubsystemFilter;
use vigia::resolver::{RequestKind, ENTRY_ID};
use vigia::stats::{Aggregated, AggregationMode};
use vigia::tracker::Tracker;
use vigia::Subsystem;

fn summaries() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-c]{1,2}\\.txt", 0..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_dedup_has_exactly_the_unique_values(values in summaries()) {
        let Aggregated::Unique(unique) = AggregationMode::Dedup.aggregate(values.clone()) else {
            panic!("dedup must produce a unique list");
        };
        let as_set: HashSet<_> = unique.iter().collect();
        prop_assert_eq!(as_set.len(), unique.len());
        prop_assert_eq!(as_set, values.iter().collect::<HashSet<_>>());
    }

    #[test]
    fn prop_frequency_counts_sum_to_calls(values in summaries()) {
        let counts = AggregationMode::Frequency.aggregate(values.clone());
        prop_assert_eq!(counts.total_calls(), Some(values.len() as u64));
        for value in &values {
            prop_assert_eq!(
                counts.count_of(value),
                Some(values.iter().filter(|v| *v == value).count() as u64)
            );
        }
    }

    #[test]
    fn prop_tracker_records_every_enabled_call(values in summaries()) {
        let mut tracker = Tracker::new(&SubsystemFilter::from_expr("modules=fs").unwrap(), false);
        for value in &values {
            tracker.record(Subsystem::Storage, Some("read"), value);
            tracker.record(Subsystem::NetworkPlain, Some("request"), value);
        }
        prop_assert_eq!(tracker.recorded(Subsystem::Storage, Some("read")), values.len());
        prop_assert_eq!(tracker.recorded(Subsystem::NetworkPlain, Some("request")), 0);

        let summary = tracker.finalize(AggregationMode::Frequency).unwrap();
        let expected = if values.is_empty() { None } else { Some(values.len() as u64) };
        prop_assert_eq!(
            summary.get(Subsystem::Storage, Some("read")).and_then(Aggregated::total_calls),
            expected
        );
    }

    /// Random load events: (requester index, target index), where index 0 is
    /// the entry unit and everything else a file under /app
    #[test]
    fn prop_tree_children_are_unique(
        events in prop::collection::vec((0usize..8, 1usize..8), 0..60)
    ) {
        let units: Vec<String> = (0..8)
            .map(|i| if i == 0 { ENTRY_ID.to_string() } else { format!("/app/u{}.js", i) })
            .collect();
        let mut tree = DependencyTree::new(false);
        let mut placed = 0;

        for (requester, target) in events {
            let placement = tree.submit(LoadEvent {
                requester: &units[requester],
                request: &units[target],
                resolved: &units[target],
                kind: RequestKind::RelativeFile,
            });
            if let Placement::Inserted(_) = placement {
                placed += 1;
            }
        }

        prop_assert_eq!(tree.len(), placed + 1);
        prop_assert!(tree.root().parent.is_none());
        for id in 0..tree.len() {
            let node = tree.node(id).unwrap();
            if id != DependencyTree::ROOT {
                prop_assert!(node.parent.is_some());
            }
            let names: BTreeSet<_> = tree.children(id).map(|c| c.display_name.clone()).collect();
            prop_assert_eq!(names.len(), node.children.len());
        }
    }
}
