//! Online incident grouping over interval-valued alert events.
//!
//! New alerts are absorbed into incidents through [`GroupMatcher`]s: exact
//! label criteria, label subsets, single-key fuzzy criteria, or pure temporal
//! coincidence. The [`GroupsCollection`] holds the live matchers, assigns
//! group ids batch by batch and ages matchers out on two timescales.

use crate::common::labels::{get, project, LabelSet, ALERT_NAME_LABEL, NAMESPACE_LABEL};
use crate::common::time::{MILLIS_PER_DAY, MILLIS_PER_HOUR, MILLIS_PER_MINUTE};

mod collection;
mod matcher;
mod reconcile;

pub use collection::{GroupedInterval, GroupsCollection};
pub use matcher::{GroupMatcher, MatchDistance};
pub use reconcile::{reconcile_groups, PreviousIncident, PreviousIncidents, RECONCILE_TOLERANCE_MS};

/// Matchers strengthened by a direct (exact label) observation survive this long.
pub const DIRECT_RETENTION_MS: i64 = 5 * MILLIS_PER_DAY;

/// Fuzzy and time-only matchers go stale after a day without strengthening.
pub const FUZZY_RETENTION_MS: i64 = 24 * MILLIS_PER_HOUR;

/// Window around a time-only matcher's end in which a new alert still counts
/// as coincident with the incident.
pub const TIME_MATCH_WINDOW_MS: i64 = 15 * MILLIS_PER_MINUTE;

/// Label keys of the main-subset (distance 1) projection.
pub static MAIN_SUBSET_KEYS: &[&str] = &["namespace", "alertname", "service", "job", "container"];

/// The always-firing heartbeat alert. A batch containing it is treated as
/// coincidental rather than correlated.
static WATCHDOG_ALERT: (&str, &str) = ("Watchdog", "openshift-monitoring");

/// Alerts that fire continuously by design and must not seed or satisfy
/// fuzzy (distance 2) criteria.
static NO_FUZZY_ALERTS: &[(&str, &str)] = &[
    ("Watchdog", "openshift-monitoring"),
    ("AlertmanagerReceiversNotConfigured", "openshift-monitoring"),
];

pub(crate) fn is_watchdog_alert(labels: &LabelSet) -> bool {
    get(labels, ALERT_NAME_LABEL) == WATCHDOG_ALERT.0
        && get(labels, NAMESPACE_LABEL) == WATCHDOG_ALERT.1
}

fn is_fuzzy_blocked(labels: &LabelSet) -> bool {
    let alertname = get(labels, ALERT_NAME_LABEL);
    let namespace = get(labels, NAMESPACE_LABEL);
    NO_FUZZY_ALERTS
        .iter()
        .any(|(a, n)| *a == alertname && *n == namespace)
}

/// The `{alertname, namespace}` projection used by distance-2 matching.
/// Blocked alerts project to the empty set and therefore neither produce nor
/// satisfy fuzzy criteria.
pub fn fuzzy_projection(labels: &LabelSet) -> LabelSet {
    if is_fuzzy_blocked(labels) {
        return LabelSet::new();
    }
    project(labels, &[ALERT_NAME_LABEL, NAMESPACE_LABEL])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fuzzy_projection_keeps_identity_keys() {
        let projected = fuzzy_projection(&labels(&[
            ("alertname", "TargetDown"),
            ("namespace", "openshift-dns"),
            ("severity", "warning"),
        ]));
        assert_eq!(
            projected,
            labels(&[("alertname", "TargetDown"), ("namespace", "openshift-dns")])
        );
    }

    #[test]
    fn test_fuzzy_projection_blocks_watchdog() {
        assert!(fuzzy_projection(&labels(&[
            ("alertname", "Watchdog"),
            ("namespace", "openshift-monitoring"),
        ]))
        .is_empty());
        // same alert name elsewhere is not blocked
        assert!(!fuzzy_projection(&labels(&[
            ("alertname", "Watchdog"),
            ("namespace", "my-app"),
        ]))
        .is_empty());
    }

    #[test]
    fn test_watchdog_detection() {
        assert!(is_watchdog_alert(&labels(&[
            ("alertname", "Watchdog"),
            ("namespace", "openshift-monitoring"),
        ])));
        assert!(!is_watchdog_alert(&labels(&[
            ("alertname", "Watchdog"),
            ("namespace", "other"),
        ])));
    }
}
