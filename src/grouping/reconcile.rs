use ahash::{AHashMap, AHashSet};
use tracing::debug;
use uuid::Uuid;

use crate::common::labels::strip_src_labels;
use crate::common::time::{Timestamp, MILLIS_PER_MINUTE};
use crate::grouping::GroupsCollection;
use crate::intervals::RangeVector;
use crate::matchers::LabelsSubsetMatcher;

/// Tolerance around a previous incident's envelope when locating the live
/// matcher that continues it.
pub const RECONCILE_TOLERANCE_MS: i64 = 10 * MILLIS_PER_MINUTE;

/// One incident reconstructed from the persisted health map.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousIncident {
    pub matcher: LabelsSubsetMatcher,
    pub uuid: Uuid,
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Previous incidents indexed by ascending start time.
#[derive(Debug, Default)]
pub struct PreviousIncidents {
    incidents: Vec<PreviousIncident>,
}

impl PreviousIncidents {
    pub fn new(mut incidents: Vec<PreviousIncident>) -> Self {
        incidents.sort_by_key(|p| p.start);
        PreviousIncidents { incidents }
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Rebuilds incidents from the persisted health-map series: the series'
    /// `src_`-prefixed labels are stripped back to the original alert labels
    /// and every continuous presence of a series becomes one incident.
    /// Series without a parsable `group_id` or without source labels are
    /// skipped.
    pub fn from_range_vector(rv: &RangeVector) -> Self {
        let mut incidents = Vec::new();
        for interval in rv.intervals() {
            let Some(uuid) = interval
                .labels
                .get("group_id")
                .and_then(|raw| Uuid::parse_str(raw).ok())
            else {
                continue;
            };
            let src = strip_src_labels(&interval.labels);
            if src.is_empty() {
                continue;
            }
            incidents.push(PreviousIncident {
                matcher: LabelsSubsetMatcher::new(src),
                uuid,
                start: interval.start,
                end: interval.end,
            });
        }
        PreviousIncidents::new(incidents)
    }

    /// Incidents whose tolerance-expanded envelope contains `t`: those that
    /// started at or before `t + tol` and ended at or after `t - tol`.
    fn at_time(&self, t: Timestamp) -> impl Iterator<Item = &PreviousIncident> {
        let cutoff = self
            .incidents
            .partition_point(|p| p.start <= t + RECONCILE_TOLERANCE_MS);
        self.incidents[..cutoff]
            .iter()
            .filter(move |p| p.end + RECONCILE_TOLERANCE_MS >= t)
    }
}

/// Rewrites freshly generated root group ids to the ids of the previous
/// incidents they continue, so incident identity survives a restart.
///
/// The first matching incident per matcher wins and every previous incident
/// continues at most one root, so the number of distinct roots is preserved.
pub fn reconcile_groups(gc: &mut GroupsCollection, previous: &PreviousIncidents) {
    let mut root_mapping: AHashMap<Uuid, Uuid> = AHashMap::new();
    let mut claimed: AHashSet<Uuid> = AHashSet::new();

    for m in gc.matchers() {
        if root_mapping.contains_key(&m.root_group_id) {
            continue;
        }
        for p in previous.at_time(m.end) {
            if claimed.contains(&p.uuid) {
                continue;
            }
            let hit = m.matchers.iter().any(|alt| p.matcher.matches(&alt.labels));
            if hit {
                root_mapping.insert(m.root_group_id, p.uuid);
                claimed.insert(p.uuid);
                break;
            }
        }
    }

    debug!(rewritten = root_mapping.len(), "reconciled previous incidents");
    for (old, new) in root_mapping {
        gc.rewrite_root(old, new);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::common::labels::LabelSet;
    use crate::common::time::{MILLIS_PER_HOUR, MILLIS_PER_MINUTE};
    use crate::intervals::{Interval, RangeSeries, Sample};

    fn base() -> Timestamp {
        chrono::Utc
            .with_ymd_and_hms(2024, 7, 1, 0, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn incident(uuid: Uuid, pairs: &[(&str, &str)], start: Timestamp, end: Timestamp) -> PreviousIncident {
        PreviousIncident {
            matcher: LabelsSubsetMatcher::new(labels(pairs)),
            uuid,
            start,
            end,
        }
    }

    /// A freshly grouped matcher inside a previous incident's envelope takes
    /// over the persisted incident id.
    #[test]
    fn test_reconcile_rewrites_root_to_previous_uuid() {
        let t = base();
        let mut gc = GroupsCollection::new();
        gc.process_intervals_batch(&[Interval::point(
            labels(&[
                ("alertname", "TargetDown"),
                ("namespace", "openshift-monitoring"),
                ("severity", "warning"),
            ]),
            t + 3 * MILLIS_PER_HOUR,
        )]);

        let g_prev = Uuid::new_v4();
        let previous = PreviousIncidents::new(vec![incident(
            g_prev,
            &[
                ("alertname", "TargetDown"),
                ("namespace", "openshift-monitoring"),
            ],
            t + MILLIS_PER_HOUR,
            t + 3 * MILLIS_PER_HOUR + 5 * MILLIS_PER_MINUTE,
        )]);

        reconcile_groups(&mut gc, &previous);
        for m in gc.matchers() {
            assert_eq!(m.root_group_id, g_prev);
        }
    }

    /// An incident outside the tolerance-expanded envelope is not adopted.
    #[test]
    fn test_reconcile_respects_envelope() {
        let t = base();
        let mut gc = GroupsCollection::new();
        let fresh = gc.process_intervals_batch(&[Interval::point(
            labels(&[("alertname", "TargetDown"), ("namespace", "ns")]),
            t + 3 * MILLIS_PER_HOUR,
        )])[0]
            .root_group_id;

        let previous = PreviousIncidents::new(vec![incident(
            Uuid::new_v4(),
            &[("alertname", "TargetDown"), ("namespace", "ns")],
            t,
            t + MILLIS_PER_HOUR,
        )]);

        reconcile_groups(&mut gc, &previous);
        assert!(gc.matchers().iter().all(|m| m.root_group_id == fresh));
    }

    /// A mismatching subset is simply skipped; the fresh id stays.
    #[test]
    fn test_reconcile_mismatch_keeps_fresh_uuid() {
        let t = base();
        let mut gc = GroupsCollection::new();
        let fresh = gc.process_intervals_batch(&[Interval::point(
            labels(&[("alertname", "TargetDown"), ("namespace", "ns")]),
            t + 3 * MILLIS_PER_HOUR,
        )])[0]
            .root_group_id;

        let previous = PreviousIncidents::new(vec![incident(
            Uuid::new_v4(),
            &[("alertname", "SomethingElse"), ("namespace", "ns")],
            t + MILLIS_PER_HOUR,
            t + 4 * MILLIS_PER_HOUR,
        )]);

        reconcile_groups(&mut gc, &previous);
        assert!(gc.matchers().iter().all(|m| m.root_group_id == fresh));
    }

    /// Every previous incident continues at most one root: the distinct-root
    /// count is preserved even when one incident could claim two roots.
    #[test]
    fn test_reconcile_preserves_root_cardinality() {
        let t = base();
        let mut gc = GroupsCollection::new();
        gc.process_intervals_batch(&[Interval::point(
            labels(&[("alertname", "AlertA"), ("namespace", "ns")]),
            t + 2 * MILLIS_PER_HOUR,
        )]);
        // a second, separate incident in the same namespace, far outside
        // every carryover horizon of the first
        gc.process_intervals_batch(&[Interval::point(
            labels(&[("alertname", "AlertB"), ("namespace", "ns")]),
            t + 40 * MILLIS_PER_HOUR,
        )]);
        let roots_before = gc.root_group_ids();
        assert_eq!(roots_before.len(), 2);

        // one persisted incident whose subset could claim either root
        let previous = PreviousIncidents::new(vec![incident(
            Uuid::new_v4(),
            &[("namespace", "ns")],
            t,
            t + 48 * MILLIS_PER_HOUR,
        )]);

        reconcile_groups(&mut gc, &previous);
        assert_eq!(gc.root_group_ids().len(), roots_before.len());
    }

    /// Health-map series reconstruct into incidents with stripped labels.
    #[test]
    fn test_from_range_vector_strips_src_prefix() {
        let t = base();
        let uuid = Uuid::new_v4();
        let rv = RangeVector {
            series: vec![
                RangeSeries {
                    labels: labels(&[
                        ("group_id", &uuid.to_string()),
                        ("layer", "core"),
                        ("component", "monitoring"),
                        ("src_alertname", "TargetDown"),
                        ("src_namespace", "openshift-monitoring"),
                    ]),
                    samples: vec![
                        Sample { timestamp: t, value: 1.0 },
                        Sample { timestamp: t + 60_000, value: 1.0 },
                    ],
                },
                // unparsable group id: skipped
                RangeSeries {
                    labels: labels(&[("group_id", "not-a-uuid"), ("src_alertname", "X")]),
                    samples: vec![Sample { timestamp: t, value: 1.0 }],
                },
            ],
            step: 60_000,
        };

        let previous = PreviousIncidents::from_range_vector(&rv);
        assert_eq!(previous.len(), 1);
        let p = &previous.incidents[0];
        assert_eq!(p.uuid, uuid);
        assert_eq!(p.start, t);
        assert_eq!(p.end, t + 60_000);
        assert_eq!(
            p.matcher,
            LabelsSubsetMatcher::new(labels(&[
                ("alertname", "TargetDown"),
                ("namespace", "openshift-monitoring"),
            ]))
        );
    }

    /// Boundary semantics of the time index: inclusive at `t + tol`.
    #[test]
    fn test_at_time_boundary_is_inclusive() {
        let t = base();
        let uuid = Uuid::new_v4();
        let previous = PreviousIncidents::new(vec![incident(
            uuid,
            &[("alertname", "A")],
            t + RECONCILE_TOLERANCE_MS,
            t + MILLIS_PER_HOUR,
        )]);

        // starts exactly at t + tol: visible
        assert_eq!(previous.at_time(t).count(), 1);
        // starts after t + tol: not visible
        assert_eq!(previous.at_time(t - 1).count(), 0);
    }
}
