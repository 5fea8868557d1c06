//! In-memory collaborators for tests: no network, deterministic payloads.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::time::Timestamp;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::intervals::RangeVector;
use crate::matchers::LabelsSubsetMatcher;
use crate::telemetry::alertmanager::SilenceSource;
use crate::telemetry::prom::Querier;
use crate::telemetry::types::InstantSample;

/// FakeQuerier serves canned responses keyed by query string. Instant
/// responses are popped in FIFO order so a test can model successive cycles;
/// range responses are served by query name.
#[derive(Default)]
pub struct FakeQuerier {
    instant: Mutex<Vec<AnalyzerResult<Vec<InstantSample>>>>,
    range: Mutex<Vec<(String, RangeVector)>>,
}

impl FakeQuerier {
    pub fn new() -> Self {
        FakeQuerier::default()
    }

    pub fn push_instant(&self, response: AnalyzerResult<Vec<InstantSample>>) {
        self.instant.lock().unwrap().push(response);
    }

    pub fn set_range(&self, query: &str, rv: RangeVector) {
        self.range.lock().unwrap().push((query.to_string(), rv));
    }
}

#[async_trait]
impl Querier for FakeQuerier {
    async fn query(&self, _query: &str, _ts: Timestamp) -> AnalyzerResult<Vec<InstantSample>> {
        let mut queue = self.instant.lock().unwrap();
        if queue.is_empty() {
            return Err(AnalyzerError::QueryExecutionError(
                "no canned instant response".to_string(),
            ));
        }
        queue.remove(0)
    }

    async fn query_range(
        &self,
        query: &str,
        _start: Timestamp,
        _end: Timestamp,
        step: Duration,
    ) -> AnalyzerResult<RangeVector> {
        let canned = self.range.lock().unwrap();
        for (name, rv) in canned.iter() {
            if name == query {
                return Ok(rv.clone());
            }
        }
        Ok(RangeVector {
            series: Vec::new(),
            step: step.as_millis() as i64,
        })
    }
}

/// FakeSilences returns a fixed silence list.
#[derive(Default)]
pub struct FakeSilences {
    pub silences: Vec<LabelsSubsetMatcher>,
}

#[async_trait]
impl SilenceSource for FakeSilences {
    async fn silenced_alerts(&self) -> AnalyzerResult<Vec<LabelsSubsetMatcher>> {
        Ok(self.silences.clone())
    }
}
