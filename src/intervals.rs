use crate::common::labels::LabelSet;
use crate::common::time::Timestamp;

/// Interval is one continuous presence of an alert identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub labels: LabelSet,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Interval {
    /// A point event: an alert observed at a single instant.
    pub fn point(labels: LabelSet, ts: Timestamp) -> Self {
        Interval {
            labels,
            start: ts,
            end: ts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// One series of a range query; samples strictly ascending by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSeries {
    pub labels: LabelSet,
    pub samples: Vec<Sample>,
}

/// The result of a range query together with the sample step used to issue it.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeVector {
    pub series: Vec<RangeSeries>,
    /// Sample step in milliseconds.
    pub step: i64,
}

impl RangeVector {
    /// Converts the sparse samples of every series into maximal continuous
    /// intervals: consecutive samples belong to the same interval iff their
    /// gap is at most one step. Empty series produce nothing.
    pub fn intervals(&self) -> Vec<Interval> {
        let mut out = Vec::new();
        for series in &self.series {
            let mut run: Option<(Timestamp, Timestamp)> = None;
            for sample in &series.samples {
                run = match run {
                    Some((start, last)) if sample.timestamp - last <= self.step => {
                        Some((start, sample.timestamp))
                    }
                    Some((start, last)) => {
                        out.push(Interval {
                            labels: series.labels.clone(),
                            start,
                            end: last,
                        });
                        Some((sample.timestamp, sample.timestamp))
                    }
                    None => Some((sample.timestamp, sample.timestamp)),
                };
            }
            if let Some((start, last)) = run {
                out.push(Interval {
                    labels: series.labels.clone(),
                    start,
                    end: last,
                });
            }
        }
        out
    }
}

/// Change bundles the intervals that begin at the same instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub timestamp: Timestamp,
    pub intervals: Vec<Interval>,
}

/// Flattens the range vector's intervals into Changes ordered by ascending
/// start time. The sort is stable, so intervals sharing a start keep the
/// series order of the input.
pub fn metrics_changes(rv: &RangeVector) -> Vec<Change> {
    let mut intervals = rv.intervals();
    intervals.sort_by_key(|i| i.start);

    let mut changes: Vec<Change> = Vec::new();
    for interval in intervals {
        match changes.last_mut() {
            Some(change) if change.timestamp == interval.start => {
                change.intervals.push(interval);
            }
            _ => changes.push(Change {
                timestamp: interval.start,
                intervals: vec![interval],
            }),
        }
    }
    changes
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

    fn series(name: &str, timestamps: &[i64]) -> RangeSeries {
        RangeSeries {
            labels: labels(&[("alertname", name)]),
            samples: timestamps
                .iter()
                .map(|ts| Sample {
                    timestamp: *ts,
                    value: 1.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_contiguous_samples_form_one_interval() {
        let rv = RangeVector {
            series: vec![series("A", &[0, 60, 120, 180])],
            step: 60,
        };
        assert_eq!(
            rv.intervals(),
            vec![Interval {
                labels: labels(&[("alertname", "A")]),
                start: 0,
                end: 180,
            }]
        );
    }

    #[test]
    fn test_gap_larger_than_step_splits_interval() {
        let rv = RangeVector {
            series: vec![series("A", &[0, 60, 300, 360])],
            step: 60,
        };
        let intervals = rv.intervals();
        assert_eq!(intervals.len(), 2);
        assert_eq!((intervals[0].start, intervals[0].end), (0, 60));
        assert_eq!((intervals[1].start, intervals[1].end), (300, 360));
    }

    #[test]
    fn test_single_sample_is_a_point_interval() {
        let rv = RangeVector {
            series: vec![series("A", &[42])],
            step: 60,
        };
        let intervals = rv.intervals();
        assert_eq!((intervals[0].start, intervals[0].end), (42, 42));
    }

    #[test]
    fn test_empty_series_produce_nothing() {
        let rv = RangeVector {
            series: vec![series("A", &[])],
            step: 60,
        };
        assert!(rv.intervals().is_empty());
    }

    #[test]
    fn test_changes_bucket_equal_starts() {
        let rv = RangeVector {
            series: vec![
                series("A", &[0, 60]),
                series("B", &[0, 60, 120]),
                series("C", &[120]),
            ],
            step: 60,
        };
        let changes = metrics_changes(&rv);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].timestamp, 0);
        assert_eq!(changes[0].intervals.len(), 2);
        // stable: series order preserved within the bucket
        assert_eq!(changes[0].intervals[0].labels, labels(&[("alertname", "A")]));
        assert_eq!(changes[1].timestamp, 120);
        assert_eq!(changes[1].intervals.len(), 1);
    }
}
