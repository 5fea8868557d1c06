use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::common::labels::{is_subset, LabelSet};
use crate::error::AnalyzerResult;

/// ValueMatcher is a boolean predicate over a single label value.
///
/// The variants form a small closed family; equality is structural: multiset
/// equality for string lists, pattern text for regexes.
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    /// Matches when the value equals any of the strings.
    StringList(Vec<String>),
    /// Matches when any of the compiled patterns matches the value.
    RegexList(Vec<Regex>),
}

impl ValueMatcher {
    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueMatcher::StringList(values.into_iter().map(Into::into).collect())
    }

    /// Compiles the given patterns. Fails only when a pattern cannot compile.
    pub fn regexes(patterns: &[&str]) -> AnalyzerResult<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            compiled.push(Regex::new(pattern)?);
        }
        Ok(ValueMatcher::RegexList(compiled))
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            ValueMatcher::StringList(values) => values.iter().any(|v| v == value),
            ValueMatcher::RegexList(regexes) => regexes.iter().any(|re| re.is_match(value)),
        }
    }
}

impl PartialEq for ValueMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueMatcher::StringList(a), ValueMatcher::StringList(b)) => {
                let mut a: Vec<&str> = a.iter().map(String::as_str).collect();
                let mut b: Vec<&str> = b.iter().map(String::as_str).collect();
                a.sort_unstable();
                b.sort_unstable();
                a == b
            }
            (ValueMatcher::RegexList(a), ValueMatcher::RegexList(b)) => {
                let mut a: Vec<&str> = a.iter().map(Regex::as_str).collect();
                let mut b: Vec<&str> = b.iter().map(Regex::as_str).collect();
                a.sort_unstable();
                b.sort_unstable();
                a == b
            }
            _ => false,
        }
    }
}

/// LabelValueMatcher applies a [`ValueMatcher`] to one label key.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelValueMatcher {
    pub key: String,
    pub matcher: ValueMatcher,
}

impl LabelValueMatcher {
    pub fn new(key: impl Into<String>, matcher: ValueMatcher) -> Self {
        LabelValueMatcher {
            key: key.into(),
            matcher,
        }
    }

    /// Returns whether the target matched and the keys the match consumed.
    pub fn matches(&self, labels: &LabelSet) -> (bool, Vec<String>) {
        match labels.get(&self.key) {
            Some(value) if self.matcher.matches(value) => (true, vec![self.key.clone()]),
            _ => (false, Vec::new()),
        }
    }
}

/// LabelsSubsetMatcher matches a target label set iff every one of its own
/// pairs is present in the target with the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelsSubsetMatcher {
    pub labels: LabelSet,
}

impl LabelsSubsetMatcher {
    pub fn new(labels: LabelSet) -> Self {
        LabelsSubsetMatcher { labels }
    }

    pub fn matches(&self, target: &LabelSet) -> bool {
        is_subset(&self.labels, target)
    }
}

impl fmt::Display for LabelsSubsetMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.labels.keys().collect();
        keys.sort();
        write!(f, "{{")?;
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={:?}", key, self.labels[key.as_str()])?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test_case("warning", true; "listed value")]
    #[test_case("critical", true; "other listed value")]
    #[test_case("info", false; "unlisted value")]
    fn test_string_list(value: &str, expected: bool) {
        let m = ValueMatcher::strings(["warning", "critical"]);
        assert_eq!(m.matches(value), expected);
    }

    #[test]
    fn test_regex_list() {
        let m = ValueMatcher::regexes(&["^Argo", "^Kube"]).unwrap();
        assert!(m.matches("ArgoAppSyncFailed"));
        assert!(m.matches("KubePodCrashLooping"));
        assert!(!m.matches("NodeClockNotSynchronising"));
    }

    #[test]
    fn test_regex_compile_failure() {
        assert!(ValueMatcher::regexes(&["("]).is_err());
    }

    #[test]
    fn test_string_list_equality_is_multiset() {
        let a = ValueMatcher::strings(["x", "y"]);
        let b = ValueMatcher::strings(["y", "x"]);
        let c = ValueMatcher::strings(["x"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_regex_equality_by_pattern() {
        let a = ValueMatcher::regexes(&["^a", "^b"]).unwrap();
        let b = ValueMatcher::regexes(&["^b", "^a"]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, ValueMatcher::strings(["^a", "^b"]));
    }

    #[test]
    fn test_label_value_matcher_reports_consumed_key() {
        let m = LabelValueMatcher::new("alertname", ValueMatcher::strings(["Watchdog"]));
        let (ok, keys) = m.matches(&labels(&[("alertname", "Watchdog")]));
        assert!(ok);
        assert_eq!(keys, vec!["alertname".to_string()]);

        let (ok, keys) = m.matches(&labels(&[("alertname", "TargetDown")]));
        assert!(!ok);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_subset_matcher() {
        let m = LabelsSubsetMatcher::new(labels(&[("namespace", "openshift-etcd")]));
        assert!(m.matches(&labels(&[
            ("namespace", "openshift-etcd"),
            ("alertname", "etcdMembersDown"),
        ])));
        assert!(!m.matches(&labels(&[("namespace", "openshift-dns")])));
        assert_eq!(
            m,
            LabelsSubsetMatcher::new(labels(&[("namespace", "openshift-etcd")]))
        );
    }
}
