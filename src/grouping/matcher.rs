use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::time::Timestamp;
use crate::grouping::{DIRECT_RETENTION_MS, FUZZY_RETENTION_MS};
use crate::intervals::Interval;
use crate::matchers::LabelsSubsetMatcher;

/// MatchDistance orders matcher classes from most to least specific.
///
/// The derived `Ord` follows declaration order, so `Exact` always beats a
/// fuzzier class during candidate selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchDistance {
    /// Full label set (distance 0).
    Exact,
    /// The `{namespace, alertname, service, job, container}` projection (distance 1).
    MainSubset,
    /// Single-key alertname/namespace criteria (distance 2).
    Fuzzy,
    /// Pure temporal coincidence, no label constraint (distance +inf).
    TimeOnly,
}

impl MatchDistance {
    /// How long a matcher of this class outlives its last strengthening event.
    pub fn retention_ms(&self) -> i64 {
        match self {
            MatchDistance::Exact => DIRECT_RETENTION_MS,
            _ => FUZZY_RETENTION_MS,
        }
    }
}

/// GroupMatcher is one criterion under which new alerts are absorbed into an
/// incident. Several matchers may share a `root_group_id`; the root is the
/// stable incident identifier exposed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMatcher {
    pub group_id: Uuid,
    pub root_group_id: Uuid,
    /// Inception; no interval starting earlier can ever match.
    pub start: Timestamp,
    /// Most recent strengthening event. Retention is measured against it.
    pub modified: Timestamp,
    /// End of the last absorbed alert interval.
    pub end: Timestamp,
    pub distance: MatchDistance,
    /// Alternative label criteria, evaluated disjunctively. Empty only for
    /// time-only matchers, which carry no label constraint.
    pub matchers: Vec<LabelsSubsetMatcher>,
}

impl GroupMatcher {
    /// A fresh time-only root seeded by the first interval of a batch.
    pub fn new_root(interval: &Interval) -> Self {
        GroupMatcher {
            group_id: Uuid::new_v4(),
            root_group_id: Uuid::new_v4(),
            start: interval.start,
            modified: interval.start,
            end: interval.end,
            distance: MatchDistance::TimeOnly,
            matchers: Vec::new(),
        }
    }

    /// A time-only root born in a watchdog-suppressed batch. `modified` is
    /// zeroed so the temporal criterion can never absorb a future alert; only
    /// the labeled siblings added alongside it keep the incident reachable.
    pub fn new_suppressed_root(interval: &Interval) -> Self {
        GroupMatcher {
            modified: 0,
            ..GroupMatcher::new_root(interval)
        }
    }

    /// A labeled sibling carrying one synthesized criterion for `interval`,
    /// attached to the incident identified by `root_group_id`.
    pub fn new_labeled(
        root_group_id: Uuid,
        distance: MatchDistance,
        subset: LabelsSubsetMatcher,
        interval: &Interval,
    ) -> Self {
        GroupMatcher {
            group_id: Uuid::new_v4(),
            root_group_id,
            start: interval.start,
            modified: interval.start,
            end: interval.end,
            distance,
            matchers: vec![subset],
        }
    }

    /// True iff any alternative criterion subsets the target projection.
    pub fn matches_any(&self, target: &crate::common::labels::LabelSet) -> bool {
        self.matchers.iter().any(|m| m.matches(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::labels::LabelSet;

    fn interval_at(ts: Timestamp) -> Interval {
        let mut labels = LabelSet::new();
        labels.insert("alertname".to_string(), "A".to_string());
        Interval::point(labels, ts)
    }

    #[test]
    fn test_distance_ordering() {
        assert!(MatchDistance::Exact < MatchDistance::MainSubset);
        assert!(MatchDistance::MainSubset < MatchDistance::Fuzzy);
        assert!(MatchDistance::Fuzzy < MatchDistance::TimeOnly);
    }

    #[test]
    fn test_retention_horizons() {
        assert_eq!(MatchDistance::Exact.retention_ms(), DIRECT_RETENTION_MS);
        assert_eq!(MatchDistance::MainSubset.retention_ms(), FUZZY_RETENTION_MS);
        assert_eq!(MatchDistance::Fuzzy.retention_ms(), FUZZY_RETENTION_MS);
        assert_eq!(MatchDistance::TimeOnly.retention_ms(), FUZZY_RETENTION_MS);
    }

    #[test]
    fn test_suppressed_root_has_zero_modified() {
        let root = GroupMatcher::new_suppressed_root(&interval_at(1_000));
        assert_eq!(root.modified, 0);
        assert_eq!(root.start, 1_000);
        assert_eq!(root.distance, MatchDistance::TimeOnly);
    }
}
