//! Tracking service against in-memory and unavailable stores

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use seo_link_engine::cache::{CacheClient, MemoryCache};
use seo_link_engine::config::TrackingConfig;
use seo_link_engine::error::{Error, Result};
use seo_link_engine::tracking::events::{ClickRecord, ImpressionRecord};
use seo_link_engine::tracking::{
    ClickStats, DeviceClass, EventStore, LinkClickEvent, LinkImpressionEvent, LinkTrackingService,
    MemoryEventStore,
};
use std::sync::Arc;

/// Every call fails as if the database were down
#[derive(Debug)]
struct UnavailableStore;

#[async_trait]
impl EventStore for UnavailableStore {
    async fn insert_click(&self, _: &ClickRecord) -> Result<()> {
        Err(Error::Storage("connection refused".into()))
    }
    async fn insert_impression(&self, _: &ImpressionRecord) -> Result<()> {
        Err(Error::Storage("connection refused".into()))
    }
    async fn click_stats(&self, _: &str, _: DateTime<Utc>, _: DateTime<Utc>) -> Result<ClickStats> {
        Err(Error::Storage("connection refused".into()))
    }
    async fn sum_impressions(&self, _: &str, _: DateTime<Utc>, _: DateTime<Utc>) -> Result<i64> {
        Err(Error::Storage("connection refused".into()))
    }
    async fn run_daily_aggregation(&self, _: NaiveDate) -> Result<NaiveDate> {
        Err(Error::Storage("routine missing".into()))
    }
    async fn last_aggregated_day(&self) -> Result<Option<NaiveDate>> {
        Err(Error::Storage("connection refused".into()))
    }
    async fn delete_clicks_before(&self, _: DateTime<Utc>) -> Result<u64> {
        Err(Error::Storage("connection refused".into()))
    }
    async fn delete_impressions_before(&self, _: DateTime<Utc>) -> Result<u64> {
        Err(Error::Storage("connection refused".into()))
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 15, 8, 30, 0).unwrap()
}

#[tokio::test]
async fn test_unavailable_store_degrades_gracefully() {
    let cache = Arc::new(MemoryCache::new());
    let svc = LinkTrackingService::new(Arc::new(UnavailableStore), cache.clone(), TrackingConfig::default());

    assert!(!svc.track_click(LinkClickEvent::new("LinkGamme", "/a", "/b")).await);
    assert!(!svc.track_impression(LinkImpressionEvent::new("LinkGamme", "/a", 3)).await);

    let metrics = svc
        .get_metrics_by_link_type("LinkGamme", None, Some(now()))
        .await
        .unwrap();
    assert!(metrics.placeholder);
    assert_eq!(metrics.total_clicks, 0);
    assert_eq!(metrics.click_through_rate, 0.0);
    // placeholders are never cached
    assert!(cache.is_empty().await);

    let report = svc.aggregate_daily_metrics().await;
    assert!(!report.success);
    assert!(report.error.unwrap().contains("routine missing"));

    assert!(matches!(svc.cleanup_old_data(90).await, Err(Error::Storage(_))));
}

#[tokio::test]
async fn test_metrics_cache_key_and_ttl() {
    let store = MemoryEventStore::new();
    let cache = Arc::new(MemoryCache::new());
    let svc = LinkTrackingService::new(Arc::new(store), cache.clone(), TrackingConfig::default())
        .with_metrics_ttl(60);

    let start = now() - Duration::days(7);
    let metrics = svc
        .get_metrics_by_link_type("Footer", Some(start), Some(now()))
        .await
        .unwrap();
    assert!(!metrics.placeholder);

    let key = LinkTrackingService::metrics_cache_key("Footer", start, now());
    assert!(key.starts_with("seo:link-metrics:Footer:"));
    assert!(cache.get_raw(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_nightly_cycle() {
    let store = MemoryEventStore::new();
    let svc = LinkTrackingService::new(
        Arc::new(store.clone()),
        Arc::new(MemoryCache::new()),
        TrackingConfig::default(),
    );

    let yesterday = now() - Duration::days(1);
    let old = now() - Duration::days(120);
    // each event is received at `at`
    for (at, session) in [(yesterday, "s1"), (yesterday, "s2"), (old, "s0")] {
        assert!(
            svc.track_click_as_of(
                LinkClickEvent::new("LinkGammeCar", "/pieces/alternateur-4.html", "/pieces/demarreur-2.html")
                    .with_session(session)
                    .with_device(DeviceClass::Tablet),
                at
            )
            .await
        );
    }
    for at in [yesterday, old] {
        svc.track_impression_as_of(LinkImpressionEvent::new("LinkGammeCar", "/pieces/alternateur-4.html", 5), at)
            .await;
    }

    // cleanup refuses until yesterday has been aggregated
    assert!(matches!(
        svc.cleanup_old_data_as_of(90, now()).await,
        Err(Error::RetentionGuard(_))
    ));

    let report = svc.aggregate_day(yesterday.date_naive()).await;
    assert!(report.success);
    assert_eq!(report.day, yesterday.date_naive());
    assert_eq!(store.last_aggregated_day().await.unwrap(), Some(report.day));
    let summaries = store.summaries().await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].clicks, 2);
    assert_eq!(summaries[0].unique_sessions, 2);
    assert_eq!(summaries[0].impressions, 5);

    let cleanup = svc.cleanup_old_data_as_of(90, now()).await.unwrap();
    assert_eq!(cleanup.clicks_deleted, 1);
    assert_eq!(cleanup.impressions_deleted, 1);
    assert_eq!(store.click_count().await, 2);
    assert_eq!(store.impression_count().await, 1);

    let metrics = svc
        .get_metrics_by_link_type("LinkGammeCar", None, Some(now()))
        .await
        .unwrap();
    assert_eq!(metrics.total_clicks, 2);
    assert!((metrics.click_through_rate - 0.4).abs() < 1e-9);
    assert_eq!(metrics.top_destinations[0].url, "/pieces/demarreur-2.html");
    assert_eq!(metrics.clicks_by_device.get("tablet"), Some(&2));
}

#[tokio::test]
async fn test_guard_can_be_disabled() {
    let config = TrackingConfig {
        require_aggregation_before_cleanup: false,
        ..TrackingConfig::default()
    };
    let svc = LinkTrackingService::new(
        Arc::new(MemoryEventStore::new()),
        Arc::new(MemoryCache::new()),
        config,
    );
    let report = svc.cleanup_old_data_as_of(30, now()).await.unwrap();
    assert_eq!(report.clicks_deleted, 0);
    assert_eq!(report.cutoff, now() - Duration::days(30));
}

/// Summarizes only one fixed day, like a database routine keyed on its own clock
#[derive(Debug, Clone)]
struct FixedDayStore {
    inner: MemoryEventStore,
    day: NaiveDate,
}

#[async_trait]
impl EventStore for FixedDayStore {
    async fn insert_click(&self, record: &ClickRecord) -> Result<()> {
        self.inner.insert_click(record).await
    }
    async fn insert_impression(&self, record: &ImpressionRecord) -> Result<()> {
        self.inner.insert_impression(record).await
    }
    async fn click_stats(&self, t: &str, s: DateTime<Utc>, e: DateTime<Utc>) -> Result<ClickStats> {
        self.inner.click_stats(t, s, e).await
    }
    async fn sum_impressions(&self, t: &str, s: DateTime<Utc>, e: DateTime<Utc>) -> Result<i64> {
        self.inner.sum_impressions(t, s, e).await
    }
    async fn run_daily_aggregation(&self, day: NaiveDate) -> Result<NaiveDate> {
        if day != self.day {
            return Err(Error::InvalidInput(format!("only {} can be aggregated", self.day)));
        }
        self.inner.run_daily_aggregation(day).await
    }
    async fn last_aggregated_day(&self) -> Result<Option<NaiveDate>> {
        self.inner.last_aggregated_day().await
    }
    async fn delete_clicks_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.inner.delete_clicks_before(cutoff).await
    }
    async fn delete_impressions_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.inner.delete_impressions_before(cutoff).await
    }
}

#[tokio::test]
async fn test_aggregation_never_records_an_unsummarized_day() {
    let yesterday = (now() - Duration::days(1)).date_naive();
    let store = FixedDayStore {
        inner: MemoryEventStore::new(),
        day: yesterday,
    };
    let svc = LinkTrackingService::new(
        Arc::new(store.clone()),
        Arc::new(MemoryCache::new()),
        TrackingConfig::default(),
    );

    let arbitrary = yesterday + Duration::days(30);
    let report = svc.aggregate_day(arbitrary).await;
    assert!(!report.success);
    assert_eq!(store.last_aggregated_day().await.unwrap(), None);
    assert!(matches!(
        svc.cleanup_old_data_as_of(90, now()).await,
        Err(Error::RetentionGuard(_))
    ));

    let report = svc.aggregate_day(yesterday).await;
    assert!(report.success);
    assert_eq!(store.last_aggregated_day().await.unwrap(), Some(report.day));
}
