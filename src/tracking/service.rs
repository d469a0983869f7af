use super::events::{LinkClickEvent, LinkImpressionEvent};
use super::metrics::{LinkMetrics, LinkPerformanceReport};
use super::store::SharedEventStore;
use crate::cache::{CacheExt, SharedCache};
use crate::config::TrackingConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Outcome of one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReport {
    pub day: NaiveDate,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub cutoff: DateTime<Utc>,
    pub clicks_deleted: u64,
    pub impressions_deleted: u64,
}

/// Click/impression recording, on-demand metrics and the nightly jobs
#[derive(Debug, Clone)]
pub struct LinkTrackingService {
    store: SharedEventStore,
    cache: SharedCache,
    config: TrackingConfig,
    metrics_ttl_seconds: u64,
}

impl LinkTrackingService {
    pub fn new(store: SharedEventStore, cache: SharedCache, config: TrackingConfig) -> Self {
        Self {
            store,
            cache,
            config,
            metrics_ttl_seconds: 300,
        }
    }

    pub fn with_metrics_ttl(mut self, ttl_seconds: u64) -> Self {
        self.metrics_ttl_seconds = ttl_seconds;
        self
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn metrics_cache_key(link_type: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "seo:link-metrics:{}:{}:{}",
            link_type,
            start.timestamp(),
            end.timestamp()
        )
    }

    fn max_clock_skew(&self) -> Duration {
        Duration::try_seconds(self.config.max_clock_skew_seconds).unwrap_or_else(Duration::zero)
    }

    /// Best effort; never fails the caller
    pub async fn track_click(&self, event: LinkClickEvent) -> bool {
        self.track_click_as_of(event, Utc::now()).await
    }

    pub async fn track_click_as_of(&self, event: LinkClickEvent, now: DateTime<Utc>) -> bool {
        if event.link_type.trim().is_empty() {
            warn!("Click event rejected: missing link type");
            return false;
        }
        let record = event.into_record(now, self.max_clock_skew());
        match self.store.insert_click(&record).await {
            Ok(()) => {
                debug!(link_type = %record.event.link_type, "Click recorded");
                true
            }
            Err(e) => {
                warn!(error = %e, link_type = %record.event.link_type, "Failed to record click");
                false
            }
        }
    }

    pub async fn track_impression(&self, event: LinkImpressionEvent) -> bool {
        self.track_impression_as_of(event, Utc::now()).await
    }

    pub async fn track_impression_as_of(&self, event: LinkImpressionEvent, now: DateTime<Utc>) -> bool {
        if event.link_type.trim().is_empty() {
            warn!("Impression event rejected: missing link type");
            return false;
        }
        if event.link_count < 0 {
            warn!(link_count = event.link_count, "Impression event rejected: negative link count");
            return false;
        }
        let record = event.into_record(now, self.max_clock_skew());
        match self.store.insert_impression(&record).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, link_type = %record.event.link_type, "Failed to record impression");
                false
            }
        }
    }

    fn resolve_window(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let end = end.unwrap_or_else(Utc::now);
        let start = match start {
            Some(start) => start,
            None => days_before(end, self.config.default_window_days)?,
        };
        Ok((start, end))
    }

    /// `None` for an empty link type or an inverted or unrepresentable
    /// window. A store failure yields placeholder metrics instead of an error.
    pub async fn get_metrics_by_link_type(
        &self,
        link_type: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Option<LinkMetrics> {
        if link_type.trim().is_empty() {
            return None;
        }
        let (start, end) = match self.resolve_window(start, end) {
            Ok(window) => window,
            Err(e) => {
                warn!(error = %e, "Metrics window rejected");
                return None;
            }
        };
        if start > end {
            warn!(%start, %end, "Metrics window is inverted");
            return None;
        }

        let key = Self::metrics_cache_key(link_type, start, end);
        match self.cache.get::<LinkMetrics>(&key).await {
            Ok(Some(metrics)) => {
                debug!(%key, "Link metrics cache hit");
                return Some(metrics);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, %key, "Link metrics cache read failed"),
        }

        let metrics = match self.compute_metrics(link_type, start, end).await {
            Ok(metrics) => metrics,
            Err(e) => {
                error!(error = %e, link_type, "Event store unavailable, serving placeholder metrics");
                return Some(LinkMetrics::placeholder(link_type, start, end));
            }
        };

        if let Err(e) = self.cache.set(&key, &metrics, self.metrics_ttl_seconds).await {
            warn!(error = %e, %key, "Link metrics cache write failed");
        }
        Some(metrics)
    }

    async fn compute_metrics(
        &self,
        link_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<LinkMetrics> {
        let stats = self.store.click_stats(link_type, start, end).await?;
        let impressions = self.store.sum_impressions(link_type, start, end).await?;
        Ok(LinkMetrics::from_stats(link_type, start, end, stats, impressions))
    }

    /// Metrics for every configured link type over one window
    pub async fn get_performance_report(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<LinkPerformanceReport> {
        let (start, end) = self.resolve_window(start, end)?;
        let mut by_link_type = Vec::with_capacity(self.config.known_link_types.len());
        for link_type in &self.config.known_link_types {
            if let Some(metrics) = self
                .get_metrics_by_link_type(link_type, Some(start), Some(end))
                .await
            {
                by_link_type.push(metrics);
            }
        }
        Ok(LinkPerformanceReport::from_metrics(start, end, by_link_type))
    }

    /// Aggregate yesterday's raw events
    pub async fn aggregate_daily_metrics(&self) -> AggregationReport {
        let yesterday = (Utc::now() - Duration::days(1)).date_naive();
        self.aggregate_day(yesterday).await
    }

    /// The report names the day the store recorded as aggregated
    pub async fn aggregate_day(&self, day: NaiveDate) -> AggregationReport {
        info!(%day, routine = %self.config.aggregation_routine, "Running daily link aggregation");
        match self.store.run_daily_aggregation(day).await {
            Ok(recorded) => {
                info!(day = %recorded, "Daily link aggregation complete");
                AggregationReport {
                    day: recorded,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                error!(%day, error = %e, "Daily link aggregation failed");
                AggregationReport {
                    day,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Delete raw events older than `days_to_keep` days
    pub async fn cleanup_old_data(&self, days_to_keep: i64) -> Result<CleanupReport> {
        self.cleanup_old_data_as_of(days_to_keep, Utc::now()).await
    }

    pub async fn cleanup_old_data_as_of(
        &self,
        days_to_keep: i64,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport> {
        if days_to_keep < 1 {
            return Err(Error::InvalidInput(format!(
                "days_to_keep must be at least 1, got {days_to_keep}"
            )));
        }
        let cutoff = days_before(now, days_to_keep)?;

        if self.config.require_aggregation_before_cleanup {
            match self.store.last_aggregated_day().await? {
                Some(day) if day >= cutoff.date_naive() => {}
                Some(day) => {
                    return Err(Error::RetentionGuard(format!(
                        "last aggregated day {day} is before cutoff {}",
                        cutoff.date_naive()
                    )))
                }
                None => {
                    return Err(Error::RetentionGuard(
                        "no aggregation run recorded".to_string(),
                    ))
                }
            }
        }

        let clicks_deleted = self.store.delete_clicks_before(cutoff).await?;
        let impressions_deleted = self.store.delete_impressions_before(cutoff).await?;
        info!(%cutoff, clicks_deleted, impressions_deleted, "Old link events removed");

        Ok(CleanupReport {
            cutoff,
            clicks_deleted,
            impressions_deleted,
        })
    }
}

/// `at` minus `days`, or `InvalidInput` when the result is out of range
fn days_before(at: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|span| at.checked_sub_signed(span))
        .ok_or_else(|| Error::InvalidInput(format!("{days} days before {at} is out of range")))
}
