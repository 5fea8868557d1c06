use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::common::labels::{
    get, project, LabelSet, ALERT_NAME_LABEL, NAMESPACE_LABEL, SEVERITY_LABEL, SILENCED_LABEL,
};
use crate::matchers::{LabelValueMatcher, ValueMatcher};

mod ranks;
pub mod tables;

pub use ranks::{component_ranks, ComponentRank};
pub use tables::{ComponentRule, WorkloadRule, COMPUTE_ALERTS, CORE_COMPONENTS, WORKLOAD_COMPONENTS};

/// Layer places a component in the cluster's dependency stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Compute,
    Core,
    Workload,
    Others,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Compute => "compute",
            Layer::Core => "core",
            Layer::Workload => "workload",
            Layer::Others => "Others",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification is the result of mapping one alert to its owning component.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub layer: Layer,
    pub component: String,
    /// Source-label projection for export: the always-kept keys plus every
    /// key the winning rule consumed.
    pub labels: LabelSet,
}

/// Cluster-version operator alerts carry the degraded operator in `name`.
static CLUSTER_VERSION_MATCHER: LazyLock<LabelValueMatcher> = LazyLock::new(|| {
    LabelValueMatcher::new(
        ALERT_NAME_LABEL,
        ValueMatcher::strings(["ClusterOperatorDown", "ClusterOperatorDegraded"]),
    )
});

/// Compiled alert-name pattern per workload rule, indexed like the table.
static WORKLOAD_PATTERNS: LazyLock<Vec<Option<LabelValueMatcher>>> = LazyLock::new(|| {
    WORKLOAD_COMPONENTS
        .iter()
        .map(|rule| match rule {
            WorkloadRule::AlertNamePattern { pattern, .. } => Some(LabelValueMatcher::new(
                ALERT_NAME_LABEL,
                ValueMatcher::regexes(&[*pattern]).expect("static workload pattern"),
            )),
            _ => None,
        })
        .collect()
});

/// Maps the alert's labels to `(layer, component)` plus the source-label
/// projection. Rule groups are evaluated in order; the first hit wins and
/// unmatched alerts land in `Others/Others`.
pub fn classify(labels: &LabelSet) -> Classification {
    let mut consumed: Vec<String> = Vec::new();
    let (layer, component) = classify_layer(labels, &mut consumed);

    let mut subset = project(
        labels,
        &[NAMESPACE_LABEL, ALERT_NAME_LABEL, SEVERITY_LABEL, SILENCED_LABEL],
    );
    for key in consumed {
        if let Some(value) = labels.get(&key) {
            subset.insert(key, value.clone());
        }
    }

    Classification {
        layer,
        component,
        labels: subset,
    }
}

fn classify_layer(labels: &LabelSet, consumed: &mut Vec<String>) -> (Layer, String) {
    let (matched, keys) = CLUSTER_VERSION_MATCHER.matches(labels);
    if matched {
        consumed.extend(keys);
        let component = match labels.get("name") {
            Some(name) => {
                consumed.push("name".to_string());
                name.clone()
            }
            None => "version".to_string(),
        };
        return (Layer::Core, component);
    }

    let alertname = get(labels, ALERT_NAME_LABEL);
    if COMPUTE_ALERTS.contains(&alertname) {
        return (Layer::Compute, "compute".to_string());
    }

    let namespace = get(labels, NAMESPACE_LABEL);
    for rule in CORE_COMPONENTS {
        if rule.namespaces.contains(&namespace) || rule.alert_names.contains(&alertname) {
            return (Layer::Core, rule.component.to_string());
        }
    }

    for (i, rule) in WORKLOAD_COMPONENTS.iter().enumerate() {
        match rule {
            WorkloadRule::Namespaces {
                component,
                namespaces,
            } => {
                if namespaces.contains(&namespace) {
                    return (Layer::Workload, component.to_string());
                }
            }
            WorkloadRule::AlertNamePattern { component, .. } => {
                let matcher = WORKLOAD_PATTERNS[i].as_ref().expect("pattern rule compiled");
                let (matched, keys) = matcher.matches(labels);
                if matched {
                    consumed.extend(keys);
                    return (Layer::Workload, component.to_string());
                }
            }
            WorkloadRule::LabelConjunction {
                component,
                labels: pairs,
            } => {
                let all = pairs
                    .iter()
                    .all(|(k, v)| labels.get(*k).is_some_and(|lv| lv == v));
                if all {
                    consumed.extend(pairs.iter().map(|(k, _)| k.to_string()));
                    return (Layer::Workload, component.to_string());
                }
            }
        }
    }

    (Layer::Others, "Others".to_string())
}
