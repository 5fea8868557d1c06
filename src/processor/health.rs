use ahash::AHashMap;
use uuid::Uuid;

use crate::classify::Layer;
use crate::common::hash::hash_labels;
use crate::common::labels::{src_prefixed, LabelSet, SRC_LABEL_PREFIX};
use crate::server::Metric;

/// Source type of health entries derived from firing alerts.
pub static SRC_TYPE_ALERT: &str = "alert";

/// HealthValue grades an exported health entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthValue {
    Healthy = 0,
    Warning = 1,
    Critical = 2,
}

impl HealthValue {
    /// Maps an alert severity to a health grade. Unknown severities count as
    /// warnings.
    pub fn from_severity(severity: &str) -> Self {
        match severity {
            "info" => HealthValue::Healthy,
            "warning" => HealthValue::Warning,
            "critical" => HealthValue::Critical,
            _ => HealthValue::Warning,
        }
    }

    /// The severity string of the group-severity count metric.
    pub fn severity(&self) -> &'static str {
        match self {
            HealthValue::Healthy => "info",
            HealthValue::Warning => "warning",
            HealthValue::Critical => "critical",
        }
    }

    pub fn value(&self) -> f64 {
        *self as i64 as f64
    }
}

/// One row of the emitted component health map.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentHealthEntry {
    pub layer: Layer,
    pub component: String,
    pub src_type: &'static str,
    pub src_labels: LabelSet,
    pub group_id: Option<Uuid>,
    pub health: HealthValue,
    pub silenced: bool,
}

impl ComponentHealthEntry {
    /// The canonical exported label map: the fixed keys plus every source
    /// label renamed `src_<key>`. Its hash is the entry's dedup identity.
    pub fn exported_labels(&self) -> LabelSet {
        let mut out = LabelSet::with_capacity(self.src_labels.len() + 4);
        out.insert("layer".to_string(), self.layer.to_string());
        out.insert("component".to_string(), self.component.clone());
        out.insert("type".to_string(), self.src_type.to_string());
        out.insert(
            "group_id".to_string(),
            self.group_id.map(|id| id.to_string()).unwrap_or_default(),
        );
        out.extend(src_prefixed(&self.src_labels));
        out
    }

    /// Renders the entry as one gauge sample: fixed labels first, source
    /// labels in sorted order for a stable exposition.
    pub fn to_metric(&self) -> Metric {
        let mut labels = Vec::with_capacity(self.src_labels.len() + 4);
        labels.push(("layer".to_string(), self.layer.to_string()));
        labels.push(("component".to_string(), self.component.clone()));
        labels.push(("type".to_string(), self.src_type.to_string()));
        labels.push((
            "group_id".to_string(),
            self.group_id.map(|id| id.to_string()).unwrap_or_default(),
        ));

        let mut src: Vec<(&String, &String)> = self.src_labels.iter().collect();
        src.sort();
        for (key, value) in src {
            labels.push((format!("{SRC_LABEL_PREFIX}{key}"), value.clone()));
        }

        Metric {
            labels,
            value: self.health.value(),
        }
    }
}

/// Collapses entries sharing the canonical label hash. The first-seen entry
/// survives carrying the worst health of its duplicates.
pub fn dedup_entries(entries: Vec<ComponentHealthEntry>) -> Vec<ComponentHealthEntry> {
    let mut out: Vec<ComponentHealthEntry> = Vec::with_capacity(entries.len());
    let mut index: AHashMap<u64, usize> = AHashMap::with_capacity(entries.len());

    for entry in entries {
        let key = hash_labels(&entry.exported_labels());
        match index.get(&key) {
            Some(&slot) => {
                let kept = &mut out[slot];
                kept.health = kept.health.max(entry.health);
            }
            None => {
                index.insert(key, out.len());
                out.push(entry);
            }
        }
    }
    out
}

/// Per-severity counts of the worst health per incident. Entries without a
/// group are excluded; all four severity series are always present.
pub fn group_severity_counts(entries: &[ComponentHealthEntry]) -> Vec<Metric> {
    let mut per_group: AHashMap<Uuid, HealthValue> = AHashMap::new();
    for entry in entries {
        let Some(group_id) = entry.group_id else {
            continue;
        };
        per_group
            .entry(group_id)
            .and_modify(|h| *h = (*h).max(entry.health))
            .or_insert(entry.health);
    }

    let mut counts: [(&str, usize); 4] = [
        ("info", 0),
        ("warning", 0),
        ("critical", 0),
        ("none", 0),
    ];
    for health in per_group.values() {
        let severity = health.severity();
        if let Some(slot) = counts.iter_mut().find(|(name, _)| *name == severity) {
            slot.1 += 1;
        }
    }

    counts
        .iter()
        .map(|(severity, count)| Metric {
            labels: vec![("severity".to_string(), severity.to_string())],
            value: *count as f64,
        })
        .collect()
}
