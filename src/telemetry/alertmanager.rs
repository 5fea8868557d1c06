use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::common::labels::LabelSet;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::matchers::LabelsSubsetMatcher;

/// SilenceSource lists the label sets of currently silenced alerts.
#[async_trait]
pub trait SilenceSource: Send + Sync {
    async fn silenced_alerts(&self) -> AnalyzerResult<Vec<LabelsSubsetMatcher>>;
}

/// One alert record of the Alertmanager v2 API. Label values are decoded
/// leniently: a record carrying a non-string value is skipped rather than
/// failing the batch.
#[derive(Debug, Deserialize)]
struct AmAlert {
    #[serde(default)]
    labels: serde_json::Map<String, serde_json::Value>,
}

/// AlertmanagerClient fetches silenced alerts from the Alertmanager API.
pub struct AlertmanagerClient {
    base: String,
    client: reqwest::Client,
}

impl AlertmanagerClient {
    pub fn new(base: &str, timeout: Duration) -> AnalyzerResult<Self> {
        Url::parse(base).map_err(|err| {
            AnalyzerError::InvalidConfiguration(format!("alertmanager url: {err}"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AnalyzerError::InvalidConfiguration(err.to_string()))?;
        Ok(AlertmanagerClient {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl SilenceSource for AlertmanagerClient {
    async fn silenced_alerts(&self) -> AnalyzerResult<Vec<LabelsSubsetMatcher>> {
        let url = format!("{}/api/v2/alerts", self.base);
        let alerts = self
            .client
            .get(&url)
            .query(&[("active", "false"), ("silenced", "true")])
            .send()
            .await
            .map_err(|err| AnalyzerError::RequestFailed(err.to_string()))?
            .error_for_status()
            .map_err(|err| AnalyzerError::RequestFailed(err.to_string()))?
            .json::<Vec<AmAlert>>()
            .await
            .map_err(|err| AnalyzerError::CannotDeserialize(err.to_string()))?;

        Ok(silence_matchers(alerts))
    }
}

fn silence_matchers(alerts: Vec<AmAlert>) -> Vec<LabelsSubsetMatcher> {
    let mut out = Vec::with_capacity(alerts.len());
    for alert in alerts {
        match string_labels(&alert.labels) {
            Some(labels) if !labels.is_empty() => out.push(LabelsSubsetMatcher::new(labels)),
            _ => debug!("skipping silence record with non-string or empty labels"),
        }
    }
    out
}

fn string_labels(raw: &serde_json::Map<String, serde_json::Value>) -> Option<LabelSet> {
    let mut labels = LabelSet::with_capacity(raw.len());
    for (key, value) in raw {
        let value = value.as_str()?;
        labels.insert(key.clone(), value.to_string());
    }
    Some(labels)
}

/// A firing alert is silenced iff every label of some silence record is
/// present in the alert with the same value.
pub fn is_silenced(alert: &LabelSet, silences: &[LabelsSubsetMatcher]) -> bool {
    silences.iter().any(|s| s.matches(alert))
}
