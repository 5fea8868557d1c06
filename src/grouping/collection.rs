use ahash::AHashSet;
use uuid::Uuid;

use crate::common::labels::LabelSet;
use crate::common::time::Timestamp;
use crate::grouping::matcher::{GroupMatcher, MatchDistance};
use crate::grouping::{
    fuzzy_projection, is_watchdog_alert, DIRECT_RETENTION_MS, FUZZY_RETENTION_MS,
    MAIN_SUBSET_KEYS, TIME_MATCH_WINDOW_MS,
};
use crate::intervals::Interval;
use crate::matchers::LabelsSubsetMatcher;

/// An interval together with the matcher that claimed it. Every interval fed
/// through [`GroupsCollection::process_intervals_batch`] is claimed; the
/// watchdog path assigns a per-interval root before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedInterval {
    pub interval: Interval,
    /// Identifier of the claiming matcher.
    pub group_id: Uuid,
    /// Stable incident identifier shared by all matchers of the incident.
    pub root_group_id: Uuid,
}

/// A match candidate: which matcher, how specific, and how far in time.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    idx: usize,
    distance: MatchDistance,
    time_dist: i64,
}

/// The set of live group matchers.
///
/// All mutation happens on the driver task; batches are processed in change
/// order, so matcher state only ever moves forward in time.
#[derive(Debug, Default)]
pub struct GroupsCollection {
    matchers: Vec<GroupMatcher>,
}

impl GroupsCollection {
    pub fn new() -> Self {
        GroupsCollection::default()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn matchers(&self) -> &[GroupMatcher] {
        &self.matchers
    }

    pub fn get(&self, group_id: Uuid) -> Option<&GroupMatcher> {
        self.matchers.iter().find(|m| m.group_id == group_id)
    }

    /// The set of distinct incident identifiers.
    pub fn root_group_ids(&self) -> AHashSet<Uuid> {
        self.matchers.iter().map(|m| m.root_group_id).collect()
    }

    /// Rewrites every matcher of the incident `old` to the incident `new`.
    pub fn rewrite_root(&mut self, old: Uuid, new: Uuid) {
        for m in &mut self.matchers {
            if m.root_group_id == old {
                m.root_group_id = new;
            }
        }
    }

    /// Assigns a group to every interval of the batch. All intervals share
    /// the same start (the batch's logical timestamp); the output is in input
    /// order and has the same length as the input.
    pub fn process_intervals_batch(&mut self, intervals: &[Interval]) -> Vec<GroupedInterval> {
        let mut results: Vec<Option<GroupedInterval>> = vec![None; intervals.len()];
        let mut batch_added: Vec<usize> = Vec::new();
        let mut unmatched: Vec<(usize, Interval)> = Vec::new();

        for (pos, interval) in intervals.iter().enumerate() {
            match self.find_group(interval) {
                Some(idx) => {
                    {
                        let m = &mut self.matchers[idx];
                        m.end = m.end.max(interval.end);
                        if m.distance != MatchDistance::Exact {
                            m.modified = interval.start;
                        }
                    }
                    // a non-exact hit teaches the incident this alert's own criteria
                    self.expand_incident(interval, idx, &mut batch_added);
                    results[pos] = Some(self.claim(interval, idx));
                }
                None => unmatched.push((pos, interval.clone())),
            }
        }

        self.add_intervals_groups(&unmatched, None, &mut batch_added, &mut results);

        results
            .into_iter()
            .map(|r| r.expect("every interval of the batch is claimed"))
            .collect()
    }

    /// Claims every interval, creating new root groups as needed. A batch
    /// containing the watchdog alert is coincidental: its intervals get
    /// per-interval roots instead of a shared one and are only cross-grouped
    /// when a labeled criterion added in the same batch catches them.
    fn add_intervals_groups(
        &mut self,
        intervals: &[(usize, Interval)],
        provided: Option<usize>,
        batch_added: &mut Vec<usize>,
        results: &mut [Option<GroupedInterval>],
    ) {
        if intervals.is_empty() {
            return;
        }
        let watchdog = intervals
            .iter()
            .any(|(_, interval)| is_watchdog_alert(&interval.labels));

        let mut root = provided;
        if root.is_none() && !watchdog {
            let matcher = GroupMatcher::new_root(&intervals[0].1);
            root = Some(self.push_matcher(matcher, batch_added));
        }

        for (pos, interval) in intervals {
            // a matcher added earlier in this batch may fit better than the root
            let chosen = match self.find_group_among(interval, batch_added) {
                Some(idx) => idx,
                None => match root {
                    Some(idx) => idx,
                    None => {
                        let matcher = GroupMatcher::new_suppressed_root(interval);
                        self.push_matcher(matcher, batch_added)
                    }
                },
            };
            let extended = self.matchers[chosen].end.max(interval.end);
            self.matchers[chosen].end = extended;
            self.expand_incident(interval, chosen, batch_added);
            results[*pos] = Some(self.claim(interval, chosen));
        }
    }

    fn claim(&self, interval: &Interval, idx: usize) -> GroupedInterval {
        let m = &self.matchers[idx];
        GroupedInterval {
            interval: interval.clone(),
            group_id: m.group_id,
            root_group_id: m.root_group_id,
        }
    }

    fn push_matcher(&mut self, matcher: GroupMatcher, batch_added: &mut Vec<usize>) -> usize {
        let idx = self.matchers.len();
        self.matchers.push(matcher);
        batch_added.push(idx);
        idx
    }

    /// Records the interval's own matching criteria as siblings of the chosen
    /// matcher's root group. An exact hit carries no new information.
    fn expand_incident(
        &mut self,
        interval: &Interval,
        chosen: usize,
        batch_added: &mut Vec<usize>,
    ) {
        if self.matchers[chosen].distance == MatchDistance::Exact {
            return;
        }
        let root_id = self.matchers[chosen].root_group_id;

        for (distance, subset) in synthesize_matchers(&interval.labels) {
            let sibling = self
                .matchers
                .iter()
                .position(|m| m.root_group_id == root_id && m.distance == distance);
            match sibling {
                Some(idx) => {
                    let m = &mut self.matchers[idx];
                    if !m.matchers.contains(&subset) {
                        m.matchers.push(subset);
                        m.modified = interval.start;
                    }
                    m.end = m.end.max(interval.end);
                }
                None => {
                    let matcher =
                        GroupMatcher::new_labeled(root_id, distance, subset, interval);
                    self.push_matcher(matcher, batch_added);
                }
            }
        }
    }

    /// Best matcher for the interval over the whole collection.
    fn find_group(&self, interval: &Interval) -> Option<usize> {
        self.select(self.candidates(interval, 0..self.matchers.len()))
    }

    /// Best matcher for the interval among the given matcher indices.
    fn find_group_among(&self, interval: &Interval, scope: &[usize]) -> Option<usize> {
        self.select(self.candidates(interval, scope.iter().copied()))
    }

    fn candidates(
        &self,
        interval: &Interval,
        scope: impl IntoIterator<Item = usize>,
    ) -> Vec<Candidate> {
        let fuzzy_target = fuzzy_projection(&interval.labels);
        let mut out = Vec::new();

        for idx in scope {
            let m = &self.matchers[idx];
            if m.start > interval.start {
                // no time travel: matchers never claim intervals that predate them
                continue;
            }
            match m.distance {
                MatchDistance::TimeOnly => {
                    if (interval.start - m.end).abs() <= TIME_MATCH_WINDOW_MS {
                        out.push(Candidate {
                            idx,
                            distance: m.distance,
                            time_dist: interval.start - m.modified,
                        });
                    }
                }
                MatchDistance::Exact => {
                    let time_dist = interval.start - m.end;
                    if time_dist <= DIRECT_RETENTION_MS && m.matches_any(&interval.labels) {
                        out.push(Candidate {
                            idx,
                            distance: m.distance,
                            time_dist,
                        });
                    }
                }
                MatchDistance::MainSubset => {
                    let time_dist = interval.start - m.modified;
                    if time_dist <= FUZZY_RETENTION_MS && m.matches_any(&interval.labels) {
                        out.push(Candidate {
                            idx,
                            distance: m.distance,
                            time_dist,
                        });
                    }
                }
                MatchDistance::Fuzzy => {
                    if fuzzy_target.is_empty() {
                        continue;
                    }
                    let time_dist = interval.start - m.modified;
                    if time_dist <= FUZZY_RETENTION_MS && m.matches_any(&fuzzy_target) {
                        out.push(Candidate {
                            idx,
                            distance: m.distance,
                            time_dist,
                        });
                    }
                }
            }
        }
        out
    }

    /// Selection rule: among candidates within the fuzzy horizon the smallest
    /// distance wins, ties broken by recency; a direct matcher within the
    /// direct horizon is the fallback.
    fn select(&self, mut candidates: Vec<Candidate>) -> Option<usize> {
        candidates.sort_by_key(|c| c.time_dist);

        if let Some(best) = candidates
            .iter()
            .filter(|c| c.time_dist <= FUZZY_RETENTION_MS)
            .min_by_key(|c| c.distance)
        {
            return Some(best.idx);
        }
        candidates
            .iter()
            .find(|c| c.distance == MatchDistance::Exact && c.time_dist <= DIRECT_RETENTION_MS)
            .map(|c| c.idx)
    }

    /// Drops matchers whose last strengthening event fell out of their
    /// retention horizon. Running it twice at the same instant is a no-op.
    pub fn prune(&mut self, now: Timestamp) {
        self.matchers
            .retain(|m| now - m.modified <= m.distance.retention_ms());
    }
}

/// The candidate matcher set synthesized for a new interval: its exact
/// labels, the main-subset projection and one single-key criterion per fuzzy
/// projection entry. Empty projections are skipped so no criterion can match
/// everything.
fn synthesize_matchers(labels: &LabelSet) -> Vec<(MatchDistance, LabelsSubsetMatcher)> {
    let mut out = Vec::with_capacity(4);
    if !labels.is_empty() {
        out.push((MatchDistance::Exact, LabelsSubsetMatcher::new(labels.clone())));
    }

    let main = crate::common::labels::project(labels, MAIN_SUBSET_KEYS);
    if !main.is_empty() {
        out.push((MatchDistance::MainSubset, LabelsSubsetMatcher::new(main)));
    }

    let fuzzy = fuzzy_projection(labels);
    for key in ["alertname", "namespace"] {
        if let Some(value) = fuzzy.get(key) {
            let mut single = LabelSet::with_capacity(1);
            single.insert(key.to_string(), value.clone());
            out.push((MatchDistance::Fuzzy, LabelsSubsetMatcher::new(single)));
        }
    }
    out
}
