use ahash::AHashMap;

/// Well-known label names.
pub static ALERT_NAME_LABEL: &str = "alertname";
pub static NAMESPACE_LABEL: &str = "namespace";
pub static SEVERITY_LABEL: &str = "severity";
pub static SILENCED_LABEL: &str = "silenced";
pub static METRIC_NAME_LABEL: &str = "__name__";

/// Prefix applied to every source label when it is exported on the health map.
pub static SRC_LABEL_PREFIX: &str = "src_";

/// LabelSet is a finite mapping from label name to label value.
pub type LabelSet = AHashMap<String, String>;

/// Returns true iff every pair of `subset` is present in `target` with the
/// same value.
pub fn is_subset(subset: &LabelSet, target: &LabelSet) -> bool {
    subset
        .iter()
        .all(|(k, v)| target.get(k).is_some_and(|tv| tv == v))
}

/// Returns the value of the label with the given name.
/// Returns an empty string if the label doesn't exist.
pub fn get<'a>(labels: &'a LabelSet, name: &str) -> &'a str {
    labels.get(name).map(String::as_str).unwrap_or("")
}

/// Projects `labels` onto `keys`, keeping only the keys that are present.
pub fn project(labels: &LabelSet, keys: &[&str]) -> LabelSet {
    let mut out = LabelSet::with_capacity(keys.len());
    for key in keys {
        if let Some(value) = labels.get(*key) {
            out.insert((*key).to_string(), value.clone());
        }
    }
    out
}

/// Renames every label `k` to `src_k` for export on the health map.
pub fn src_prefixed(labels: &LabelSet) -> LabelSet {
    labels
        .iter()
        .map(|(k, v)| (format!("{SRC_LABEL_PREFIX}{k}"), v.clone()))
        .collect()
}

/// Inverts [`src_prefixed`]: keeps the `src_`-prefixed labels with the prefix
/// stripped and drops everything else (layer, component, group_id, ...).
pub fn strip_src_labels(labels: &LabelSet) -> LabelSet {
    labels
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(SRC_LABEL_PREFIX)
                .map(|name| (name.to_string(), v.clone()))
        })
        .collect()
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
    fn test_is_subset() {
        let target = labels(&[("alertname", "TargetDown"), ("namespace", "ns1")]);
        assert!(is_subset(&labels(&[("namespace", "ns1")]), &target));
        assert!(is_subset(&LabelSet::new(), &target));
        assert!(!is_subset(&labels(&[("namespace", "ns2")]), &target));
        assert!(!is_subset(&labels(&[("job", "node")]), &target));
    }

    #[test]
    fn test_project_keeps_present_keys_only() {
        let source = labels(&[("alertname", "A"), ("namespace", "ns")]);
        let projected = project(&source, &["alertname", "service"]);
        assert_eq!(projected, labels(&[("alertname", "A")]));
    }

    #[test]
    fn test_src_prefix_round_trip() {
        let source = labels(&[("alertname", "A"), ("severity", "warning")]);
        let mut exported = src_prefixed(&source);
        exported.insert("layer".to_string(), "core".to_string());
        exported.insert("group_id".to_string(), "abc".to_string());
        assert_eq!(strip_src_labels(&exported), source);
    }
}
