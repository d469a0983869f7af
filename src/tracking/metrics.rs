//! Derived link metrics

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Click counts for one destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationCount {
    pub url: String,
    pub clicks: i64,
}

/// Raw click aggregates for one link type and window, as returned by a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickStats {
    pub total_clicks: i64,
    pub unique_sessions: i64,
    /// Ordered by clicks descending, then URL
    pub top_destinations: Vec<DestinationCount>,
    pub clicks_by_device: BTreeMap<String, i64>,
}

pub const TOP_DESTINATIONS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetrics {
    pub link_type: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_clicks: i64,
    pub unique_sessions: i64,
    pub total_impressions: i64,
    /// clicks / sum(impression link counts), 0 without impressions
    pub click_through_rate: f64,
    pub top_destinations: Vec<DestinationCount>,
    pub clicks_by_device: BTreeMap<String, i64>,
    /// Served because the event store was unavailable
    pub placeholder: bool,
}

impl LinkMetrics {
    pub fn from_stats(
        link_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        stats: ClickStats,
        total_impressions: i64,
    ) -> Self {
        Self {
            link_type: link_type.to_string(),
            start,
            end,
            total_clicks: stats.total_clicks,
            unique_sessions: stats.unique_sessions,
            total_impressions,
            click_through_rate: click_through_rate(stats.total_clicks, total_impressions),
            top_destinations: stats.top_destinations,
            clicks_by_device: stats.clicks_by_device,
            placeholder: false,
        }
    }

    /// Fixed all-zero metrics so dashboards keep rendering
    pub fn placeholder(link_type: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            placeholder: true,
            ..Self::from_stats(link_type, start, end, ClickStats::default(), 0)
        }
    }
}

pub fn click_through_rate(clicks: i64, impressions: i64) -> f64 {
    if impressions <= 0 {
        0.0
    } else {
        clicks as f64 / impressions as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPerformanceReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub by_link_type: Vec<LinkMetrics>,
    pub total_clicks: i64,
    /// Mean of the per-type rates
    pub average_ctr: f64,
}

impl LinkPerformanceReport {
    pub fn from_metrics(start: DateTime<Utc>, end: DateTime<Utc>, by_link_type: Vec<LinkMetrics>) -> Self {
        let total_clicks = by_link_type.iter().map(|m| m.total_clicks).sum();
        let average_ctr = if by_link_type.is_empty() {
            0.0
        } else {
            by_link_type.iter().map(|m| m.click_through_rate).sum::<f64>() / by_link_type.len() as f64
        };
        Self {
            start,
            end,
            by_link_type,
            total_clicks,
            average_ctr,
        }
    }
}

/// Summary row written by the daily aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLinkSummary {
    pub day: NaiveDate,
    pub link_type: String,
    pub clicks: i64,
    pub unique_sessions: i64,
    pub impressions: i64,
}
