//! Wire format of the Prometheus HTTP API v1.

use ahash::AHashMap;
use serde::Deserialize;

use crate::common::labels::LabelSet;
use crate::common::time::Timestamp;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::intervals::{RangeSeries, RangeVector, Sample};

#[derive(Debug, Deserialize)]
pub struct PromResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<PromData>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PromResponse {
    /// Unwraps a successful payload or surfaces the API error.
    pub fn into_data(self) -> AnalyzerResult<PromData> {
        if self.status != "success" {
            return Err(AnalyzerError::QueryExecutionError(
                self.error.unwrap_or_else(|| format!("status {}", self.status)),
            ));
        }
        self.data
            .ok_or_else(|| AnalyzerError::CannotDeserialize("missing data field".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct PromData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: Vec<PromSeries>,
}

#[derive(Debug, Deserialize)]
pub struct PromSeries {
    pub metric: AHashMap<String, String>,
    /// Instant vectors carry one sample.
    #[serde(default)]
    pub value: Option<PromSample>,
    /// Matrices carry a sample list.
    #[serde(default)]
    pub values: Vec<PromSample>,
}

/// A sample is encoded as `[unix_seconds, "value"]`.
#[derive(Debug, Deserialize)]
pub struct PromSample(pub f64, pub String);

impl PromSample {
    pub fn to_sample(&self) -> AnalyzerResult<Sample> {
        let value = self
            .1
            .parse::<f64>()
            .map_err(|err| AnalyzerError::CannotDeserialize(format!("sample value: {err}")))?;
        Ok(Sample {
            timestamp: (self.0 * 1_000.0) as Timestamp,
            value,
        })
    }
}

/// One element of an instant vector.
#[derive(Debug, Clone, PartialEq)]
pub struct InstantSample {
    pub labels: LabelSet,
    pub value: f64,
}

/// Converts a vector payload into instant samples.
pub fn vector_samples(data: PromData) -> AnalyzerResult<Vec<InstantSample>> {
    let mut out = Vec::with_capacity(data.result.len());
    for series in data.result {
        let Some(sample) = &series.value else {
            continue;
        };
        out.push(InstantSample {
            labels: series.metric,
            value: sample.to_sample()?.value,
        });
    }
    Ok(out)
}

/// Converts a matrix payload into a range vector with the given step.
pub fn matrix_range_vector(data: PromData, step_ms: i64) -> AnalyzerResult<RangeVector> {
    let mut series_out = Vec::with_capacity(data.result.len());
    for series in data.result {
        let mut samples = Vec::with_capacity(series.values.len());
        for raw in &series.values {
            samples.push(raw.to_sample()?);
        }
        series_out.push(RangeSeries {
            labels: series.metric,
            samples,
        });
    }
    Ok(RangeVector {
        series: series_out,
        step: step_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instant_vector() {
        let raw = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {
                        "metric": {"alertname": "TargetDown", "namespace": "openshift-dns"},
                        "value": [1719792000, "1"]
                    }
                ]
            }
        }"#;
        let response: PromResponse = serde_json::from_str(raw).unwrap();
        let samples = vector_samples(response.into_data().unwrap()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 1.0);
        assert_eq!(
            samples[0].labels.get("alertname").map(String::as_str),
            Some("TargetDown")
        );
    }

    #[test]
    fn test_parse_matrix() {
        let raw = r#"{
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {
                        "metric": {"alertname": "A"},
                        "values": [[1719792000, "1"], [1719792060, "1"]]
                    }
                ]
            }
        }"#;
        let response: PromResponse = serde_json::from_str(raw).unwrap();
        let rv = matrix_range_vector(response.into_data().unwrap(), 60_000).unwrap();
        assert_eq!(rv.series.len(), 1);
        assert_eq!(rv.series[0].samples.len(), 2);
        assert_eq!(rv.series[0].samples[0].timestamp, 1_719_792_000_000);
    }

    #[test]
    fn test_error_status_is_surfaced() {
        let raw = r#"{"status": "error", "error": "query timed out"}"#;
        let response: PromResponse = serde_json::from_str(raw).unwrap();
        let err = response.into_data().unwrap_err();
        assert_eq!(
            err,
            AnalyzerError::QueryExecutionError("query timed out".to_string())
        );
    }

    #[test]
    fn test_unparsable_sample_value() {
        let sample = PromSample(1.0, "not-a-number".to_string());
        assert!(sample.to_sample().is_err());
    }
}
