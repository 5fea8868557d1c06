use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::common::time::Timestamp;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::intervals::RangeVector;
use crate::telemetry::types::{matrix_range_vector, vector_samples, InstantSample, PromResponse};

/// Querier wraps the instant and range query operations of the telemetry
/// store, so the processor can run against fakes in tests.
#[async_trait]
pub trait Querier: Send + Sync {
    /// Executes an instant request with the given query at the given ts.
    async fn query(&self, query: &str, ts: Timestamp) -> AnalyzerResult<Vec<InstantSample>>;

    /// Executes a range request with the given query over `[start, end]`.
    async fn query_range(
        &self,
        query: &str,
        start: Timestamp,
        end: Timestamp,
        step: Duration,
    ) -> AnalyzerResult<RangeVector>;
}

/// PromClient queries a Prometheus-compatible HTTP API.
pub struct PromClient {
    base: String,
    client: reqwest::Client,
}

impl PromClient {
    /// Validates the base URL and builds a client with the per-request
    /// timeout. The timeout bounds every query; a stuck request never blocks
    /// the next processing tick.
    pub fn new(base: &str, timeout: Duration) -> AnalyzerResult<Self> {
        Url::parse(base)
            .map_err(|err| AnalyzerError::InvalidConfiguration(format!("prom url: {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AnalyzerError::InvalidConfiguration(err.to_string()))?;
        Ok(PromClient {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> AnalyzerResult<PromResponse> {
        let url = format!("{}{path}", self.base);
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|err| AnalyzerError::RequestFailed(err.to_string()))?
            .error_for_status()
            .map_err(|err| AnalyzerError::RequestFailed(err.to_string()))?;
        response
            .json::<PromResponse>()
            .await
            .map_err(|err| AnalyzerError::CannotDeserialize(err.to_string()))
    }
}

#[async_trait]
impl Querier for PromClient {
    async fn query(&self, query: &str, ts: Timestamp) -> AnalyzerResult<Vec<InstantSample>> {
        let params = [
            ("query", query.to_string()),
            ("time", format_timestamp(ts)),
        ];
        let data = self.get("/api/v1/query", &params).await?.into_data()?;
        vector_samples(data)
    }

    async fn query_range(
        &self,
        query: &str,
        start: Timestamp,
        end: Timestamp,
        step: Duration,
    ) -> AnalyzerResult<RangeVector> {
        let params = [
            ("query", query.to_string()),
            ("start", format_timestamp(start)),
            ("end", format_timestamp(end)),
            ("step", step.as_secs().to_string()),
        ];
        let data = self.get("/api/v1/query_range", &params).await?.into_data()?;
        matrix_range_vector(data, step.as_millis() as i64)
    }
}

/// Renders a millisecond timestamp as fractional unix seconds.
fn format_timestamp(ts: Timestamp) -> String {
    format!("{:.3}", ts as f64 / 1_000.0)
}
