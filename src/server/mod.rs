use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{AnalyzerError, AnalyzerResult};

mod metric_set;

pub use metric_set::{Metric, MetricSet};

/// The daemon's published metric families.
#[derive(Debug)]
pub struct Metrics {
    /// Per-alert component health map.
    pub health_map: MetricSet,
    /// Static component ranks.
    pub components: MetricSet,
    /// Per-severity incident counts.
    pub group_severity: MetricSet,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            health_map: MetricSet::new(
                "cluster:health:components:map",
                "Health of each firing alert, labeled with its owning component and incident.",
            ),
            components: MetricSet::new(
                "cluster:health:components",
                "Static rank of each known component.",
            ),
            group_severity: MetricSet::new(
                "cluster:health:group_severity:count",
                "Number of incident groups per severity.",
            ),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(4096);
        self.health_map.render(&mut out);
        self.components.render(&mut out);
        self.group_severity.render(&mut out);
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics::new()
    }
}

/// Serves `/metrics`, `/healthz` and a landing page on the bound listener
/// until the token is cancelled. Scrapers only ever read published snapshots.
pub async fn serve(
    listener: TcpListener,
    metrics: Arc<Metrics>,
    token: CancellationToken,
) -> AnalyzerResult<()> {
    let app = Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/metrics", get(render_metrics))
        .with_state(metrics);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "serving metrics");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(token.cancelled_owned())
        .await
        .map_err(|err| AnalyzerError::ServeError(err.to_string()))
}

async fn root() -> &'static str {
    "cluster-health: see /metrics\n"
}

async fn healthz() -> &'static str {
    "ok"
}

async fn render_metrics(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    // as defined by the Prometheus exposition format
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_all_families() {
        let metrics = Metrics::new();
        metrics.group_severity.update(vec![Metric {
            labels: vec![("severity".to_string(), "info".to_string())],
            value: 0.0,
        }]);

        let out = metrics.render();
        assert!(out.contains("# TYPE cluster:health:components:map gauge"));
        assert!(out.contains("# TYPE cluster:health:components gauge"));
        assert!(out.contains("cluster:health:group_severity:count{severity=\"info\"} 0"));
    }
}
