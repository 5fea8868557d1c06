use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::{classify, component_ranks};
use crate::common::labels::{
    get, LabelSet, METRIC_NAME_LABEL, SEVERITY_LABEL, SILENCED_LABEL,
};
use crate::common::time::{current_time_millis, Timestamp, MILLIS_PER_DAY};
use crate::error::AnalyzerResult;
use crate::grouping::{reconcile_groups, GroupsCollection, PreviousIncidents};
use crate::intervals::{metrics_changes, Interval};
use crate::server::{Metric, Metrics};
use crate::telemetry::{is_silenced, InstantSample, Querier, SilenceSource};

mod health;

pub use health::{
    dedup_entries, group_severity_counts, ComponentHealthEntry, HealthValue, SRC_TYPE_ALERT,
};

/// Instant query returning the currently firing alerts.
pub const ACTIVE_ALERTS_QUERY: &str = "ALERTS{alertstate=\"firing\"}";

/// Name of the persisted health-map metric, re-read at startup.
pub const HEALTH_MAP_METRIC: &str = "cluster:health:components:map";

/// History window replayed at cold start.
pub const RESTORE_LOOKBACK_MS: i64 = 4 * MILLIS_PER_DAY;

/// Sample step of the restore queries.
pub const RESTORE_STEP: Duration = Duration::from_secs(60);

/// Retry schedule for transient telemetry failures within one cycle.
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_FACTOR: f64 = 1.5;
const BACKOFF_STEPS: u32 = 4;

/// Processor is the single long-running driver: it polls firing alerts,
/// groups them into incidents, and publishes the derived metric families.
/// All grouping state lives here, on one task.
pub struct Processor {
    querier: Arc<dyn Querier>,
    silences: Option<Arc<dyn SilenceSource>>,
    metrics: Arc<Metrics>,
    interval: Duration,
    groups: GroupsCollection,
    groups_ready: bool,
}

impl Processor {
    pub fn new(
        querier: Arc<dyn Querier>,
        silences: Option<Arc<dyn SilenceSource>>,
        metrics: Arc<Metrics>,
        interval: Duration,
    ) -> Self {
        Processor {
            querier,
            silences,
            metrics,
            interval,
            groups: GroupsCollection::new(),
            groups_ready: false,
        }
    }

    /// Replays the alert history into a fresh matcher set and re-labels the
    /// resulting root groups with the incident ids already persisted in the
    /// health map, so incident identity survives the restart.
    ///
    /// Failures degrade rather than abort: an unreadable history yields an
    /// empty collection, an unreadable health map skips reconciliation. The
    /// processor always comes out ready to group.
    pub async fn restore_groups(&mut self, now: Timestamp) {
        let start = now - RESTORE_LOOKBACK_MS;

        match self
            .querier
            .query_range(ACTIVE_ALERTS_QUERY, start, now, RESTORE_STEP)
            .await
        {
            Ok(rv) => {
                let changes = metrics_changes(&rv);
                for change in &changes {
                    self.groups.process_intervals_batch(&change.intervals);
                }
                debug!(changes = changes.len(), "replayed alert history");
            }
            Err(err) => {
                warn!(error = %err, "failed to load alert history, starting with fresh groups");
            }
        }

        match self
            .querier
            .query_range(HEALTH_MAP_METRIC, start, now, RESTORE_STEP)
            .await
        {
            Ok(rv) => {
                let previous = PreviousIncidents::from_range_vector(&rv);
                reconcile_groups(&mut self.groups, &previous);
                debug!(incidents = previous.len(), "reconciled persisted incidents");
            }
            Err(err) => {
                warn!(error = %err, "failed to load persisted health map, keeping fresh group ids");
            }
        }

        self.groups_ready = true;
        info!(
            matchers = self.groups.len(),
            roots = self.groups.root_group_ids().len(),
            "restored incident groups"
        );
    }

    /// Drives the periodic processing until the token is cancelled. The first
    /// cycle runs immediately; a failed cycle never prevents the next tick.
    pub async fn run(mut self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("processor stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }
            let now = current_time_millis();
            if let Err(err) = self.process_cycle(now, &token).await {
                warn!(error = %err, "processing cycle failed");
            }
        }
    }

    /// One full cycle: poll, group, prune, classify, dedup, publish.
    pub async fn process_cycle(
        &mut self,
        now: Timestamp,
        token: &CancellationToken,
    ) -> AnalyzerResult<()> {
        let alerts = self.query_alerts_with_backoff(now, token).await?;
        let silences = self.fetch_silences().await;

        // stamp silenced alerts before classification so the flag is exported
        let mut label_sets: Vec<LabelSet> = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let mut labels = alert.labels;
            labels.remove(METRIC_NAME_LABEL);
            if is_silenced(&labels, &silences) {
                labels.insert(SILENCED_LABEL.to_string(), "true".to_string());
            }
            label_sets.push(labels);
        }

        let group_ids = self.group_alerts(&label_sets, now);
        self.groups.prune(now);

        let mut entries = Vec::with_capacity(label_sets.len());
        for (labels, group_id) in label_sets.iter().zip(group_ids) {
            let classification = classify(labels);
            entries.push(ComponentHealthEntry {
                layer: classification.layer,
                component: classification.component,
                src_type: SRC_TYPE_ALERT,
                src_labels: classification.labels,
                group_id,
                health: HealthValue::from_severity(get(labels, SEVERITY_LABEL)),
                silenced: labels.contains_key(SILENCED_LABEL),
            });
        }
        let entries = dedup_entries(entries);

        self.metrics
            .health_map
            .update(entries.iter().map(ComponentHealthEntry::to_metric).collect());
        self.metrics
            .group_severity
            .update(group_severity_counts(&entries));
        self.metrics.components.update(rank_metrics());

        debug!(
            entries = entries.len(),
            matchers = self.groups.len(),
            roots = self.groups.root_group_ids().len(),
            "cycle complete"
        );
        Ok(())
    }

    /// Assigns an incident to every alert of the batch. Grouping is skipped
    /// until the groups are initialized; entries then carry no group id.
    fn group_alerts(&mut self, label_sets: &[LabelSet], now: Timestamp) -> Vec<Option<Uuid>> {
        if !self.groups_ready || label_sets.is_empty() {
            return vec![None; label_sets.len()];
        }
        let intervals: Vec<Interval> = label_sets
            .iter()
            .map(|labels| Interval::point(labels.clone(), now))
            .collect();
        self.groups
            .process_intervals_batch(&intervals)
            .into_iter()
            .map(|grouped| Some(grouped.root_group_id))
            .collect()
    }

    async fn query_alerts_with_backoff(
        &self,
        now: Timestamp,
        token: &CancellationToken,
    ) -> AnalyzerResult<Vec<InstantSample>> {
        let mut delay = BACKOFF_BASE;
        let mut attempt = 0;
        loop {
            match self.querier.query(ACTIVE_ALERTS_QUERY, now).await {
                Ok(alerts) => return Ok(alerts),
                Err(err) if attempt < BACKOFF_STEPS && !token.is_cancelled() => {
                    warn!(error = %err, attempt, "active alerts query failed, backing off");
                    tokio::select! {
                        _ = token.cancelled() => return Err(err),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay = delay.mul_f64(BACKOFF_FACTOR);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// A failing Alertmanager degrades to "nothing silenced"; it never fails
    /// the cycle.
    async fn fetch_silences(&self) -> Vec<crate::matchers::LabelsSubsetMatcher> {
        let Some(source) = &self.silences else {
            return Vec::new();
        };
        match source.silenced_alerts().await {
            Ok(silences) => silences,
            Err(err) => {
                warn!(error = %err, "failed to fetch silences");
                Vec::new()
            }
        }
    }
}

fn rank_metrics() -> Vec<Metric> {
    component_ranks()
        .iter()
        .map(|rank| Metric {
            labels: vec![
                ("layer".to_string(), rank.layer.to_string()),
                ("component".to_string(), rank.component.to_string()),
            ],
            value: rank.rank as f64,
        })
        .collect()
}
