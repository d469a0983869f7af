//! Raw event storage

use super::events::{ClickRecord, ImpressionRecord};
use super::metrics::{ClickStats, DailyLinkSummary, DestinationCount, TOP_DESTINATIONS_LIMIT};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Append-only click and impression storage.
///
/// Windows are inclusive on both ends. Deletions use a strict `<` on the
/// event timestamp so a row exactly at the cutoff survives.
#[async_trait]
pub trait EventStore: Send + Sync + std::fmt::Debug {
    async fn insert_click(&self, record: &ClickRecord) -> Result<()>;

    async fn insert_impression(&self, record: &ImpressionRecord) -> Result<()>;

    async fn click_stats(&self, link_type: &str, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<ClickStats>;

    /// Sum of `link_count` over impressions in the window
    async fn sum_impressions(&self, link_type: &str, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<i64>;

    /// Summarize one day of raw events and record it as aggregated, returning
    /// the day actually summarized. Re-running a day replaces its summary.
    /// Stores that can only summarize a fixed day fail for any other.
    async fn run_daily_aggregation(&self, day: NaiveDate) -> Result<NaiveDate>;

    /// Most recent day whose aggregation succeeded
    async fn last_aggregated_day(&self) -> Result<Option<NaiveDate>>;

    async fn delete_clicks_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn delete_impressions_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

pub type SharedEventStore = Arc<dyn EventStore>;

#[derive(Debug, Default)]
struct MemoryState {
    clicks: Vec<ClickRecord>,
    impressions: Vec<ImpressionRecord>,
    summaries: BTreeMap<(NaiveDate, String), DailyLinkSummary>,
    last_aggregated: Option<NaiveDate>,
}

/// In-process event store for tests and single-node deployments
#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn click_count(&self) -> usize {
        self.state.read().await.clicks.len()
    }

    pub async fn impression_count(&self) -> usize {
        self.state.read().await.impressions.len()
    }

    pub async fn summaries(&self) -> Vec<DailyLinkSummary> {
        self.state.read().await.summaries.values().cloned().collect()
    }
}

fn in_window(ts: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    ts >= start && ts <= end
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert_click(&self, record: &ClickRecord) -> Result<()> {
        self.state.write().await.clicks.push(record.clone());
        Ok(())
    }

    async fn insert_impression(&self, record: &ImpressionRecord) -> Result<()> {
        self.state.write().await.impressions.push(record.clone());
        Ok(())
    }

    async fn click_stats(
        &self,
        link_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ClickStats> {
        let state = self.state.read().await;
        let mut stats = ClickStats::default();
        let mut sessions = HashSet::new();
        let mut destinations: HashMap<&str, i64> = HashMap::new();

        for click in state
            .clicks
            .iter()
            .filter(|c| c.event.link_type == link_type && in_window(c.timestamp, start, end))
        {
            stats.total_clicks += 1;
            if let Some(session) = click.event.session_id.as_deref() {
                sessions.insert(session);
            }
            *destinations.entry(click.event.destination_url.as_str()).or_default() += 1;
            let device = click
                .event
                .device_type
                .map(|d| d.as_str())
                .unwrap_or("unknown");
            *stats.clicks_by_device.entry(device.to_string()).or_default() += 1;
        }

        stats.unique_sessions = sessions.len() as i64;

        let mut top: Vec<DestinationCount> = destinations
            .into_iter()
            .map(|(url, clicks)| DestinationCount {
                url: url.to_string(),
                clicks,
            })
            .collect();
        top.sort_by(|a, b| b.clicks.cmp(&a.clicks).then_with(|| a.url.cmp(&b.url)));
        top.truncate(TOP_DESTINATIONS_LIMIT);
        stats.top_destinations = top;

        Ok(stats)
    }

    async fn sum_impressions(
        &self,
        link_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .impressions
            .iter()
            .filter(|i| i.event.link_type == link_type && in_window(i.timestamp, start, end))
            .map(|i| i64::from(i.event.link_count))
            .sum())
    }

    async fn run_daily_aggregation(&self, day: NaiveDate) -> Result<NaiveDate> {
        let mut state = self.state.write().await;

        let mut rows: BTreeMap<String, (i64, HashSet<String>, i64)> = BTreeMap::new();
        for click in state.clicks.iter().filter(|c| c.timestamp.date_naive() == day) {
            let row = rows.entry(click.event.link_type.clone()).or_default();
            row.0 += 1;
            if let Some(session) = &click.event.session_id {
                row.1.insert(session.clone());
            }
        }
        for impression in state
            .impressions
            .iter()
            .filter(|i| i.timestamp.date_naive() == day)
        {
            rows.entry(impression.event.link_type.clone()).or_default().2 +=
                i64::from(impression.event.link_count);
        }

        state.summaries.retain(|(d, _), _| *d != day);
        for (link_type, (clicks, sessions, impressions)) in rows {
            state.summaries.insert(
                (day, link_type.clone()),
                DailyLinkSummary {
                    day,
                    link_type,
                    clicks,
                    unique_sessions: sessions.len() as i64,
                    impressions,
                },
            );
        }

        state.last_aggregated = Some(state.last_aggregated.map_or(day, |d| d.max(day)));
        Ok(day)
    }

    async fn last_aggregated_day(&self) -> Result<Option<NaiveDate>> {
        Ok(self.state.read().await.last_aggregated)
    }

    async fn delete_clicks_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.clicks.len();
        state.clicks.retain(|c| c.timestamp >= cutoff);
        Ok((before - state.clicks.len()) as u64)
    }

    async fn delete_impressions_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.impressions.len();
        state.impressions.retain(|i| i.timestamp >= cutoff);
        Ok((before - state.impressions.len()) as u64)
    }
}
