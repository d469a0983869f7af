//! PostgreSQL event store
//!
//! Raw events live in `seo_link_clicks` / `seo_link_impressions`. The daily
//! summary is produced by a stored routine called by name. The routine
//! summarizes the database's yesterday, so runs happen in a UTC transaction
//! that also records that same day in `seo_link_aggregation_runs`, which
//! backs the cleanup watermark.

use super::events::{ClickRecord, ImpressionRecord};
use super::metrics::{ClickStats, DestinationCount, TOP_DESTINATIONS_LIMIT};
use super::store::EventStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use sqlx::{PgPool, Row};
use std::sync::LazyLock;
use tracing::info;

static ROUTINE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid routine regex"));

const AGGREGATION_DAY_SQL: &str = "SELECT CURRENT_DATE - 1";

const RECORD_RUN_SQL: &str = r#"
    INSERT INTO seo_link_aggregation_runs (day) VALUES (CURRENT_DATE - 1)
    ON CONFLICT (day) DO UPDATE SET completed_at = NOW()
    RETURNING day
"#;

#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
    aggregation_routine: String,
}

impl PgEventStore {
    /// The routine name is interpolated into SQL, so only plain identifiers are accepted.
    pub fn new(pool: PgPool, aggregation_routine: &str) -> Result<Self> {
        if !ROUTINE_NAME.is_match(aggregation_routine) {
            return Err(Error::Config(format!(
                "invalid aggregation routine name: {aggregation_routine}"
            )));
        }
        Ok(Self {
            pool,
            aggregation_routine: aggregation_routine.to_string(),
        })
    }

    /// Create tables, indexes and the default aggregation routine
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seo_link_clicks (
                id BIGSERIAL PRIMARY KEY,
                link_type TEXT NOT NULL,
                source_url TEXT NOT NULL,
                destination_url TEXT NOT NULL,
                anchor_text TEXT,
                link_position INTEGER,
                session_id TEXT,
                user_id TEXT,
                device_type TEXT,
                user_agent TEXT,
                referer TEXT,
                verb_id INTEGER,
                noun_id INTEGER,
                formula TEXT,
                target_gamme_id BIGINT,
                clicked_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_seo_link_clicks_type_time
                ON seo_link_clicks(link_type, clicked_at);

            CREATE TABLE IF NOT EXISTS seo_link_impressions (
                id BIGSERIAL PRIMARY KEY,
                link_type TEXT NOT NULL,
                page_url TEXT NOT NULL,
                link_count INTEGER NOT NULL,
                session_id TEXT,
                viewed_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_seo_link_impressions_type_time
                ON seo_link_impressions(link_type, viewed_at);

            CREATE TABLE IF NOT EXISTS seo_link_metrics_daily (
                day DATE NOT NULL,
                link_type TEXT NOT NULL,
                clicks BIGINT NOT NULL,
                unique_sessions BIGINT NOT NULL,
                impressions BIGINT NOT NULL,
                PRIMARY KEY (day, link_type)
            );

            CREATE TABLE IF NOT EXISTS seo_link_aggregation_runs (
                day DATE PRIMARY KEY,
                completed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        let routine = format!(
            r#"
            CREATE OR REPLACE FUNCTION {name}() RETURNS void AS $$
            BEGIN
                DELETE FROM seo_link_metrics_daily WHERE day = CURRENT_DATE - 1;
                INSERT INTO seo_link_metrics_daily (day, link_type, clicks, unique_sessions, impressions)
                SELECT CURRENT_DATE - 1, t.link_type,
                       COALESCE(c.clicks, 0), COALESCE(c.sessions, 0), COALESCE(i.impressions, 0)
                FROM (
                    SELECT link_type FROM seo_link_clicks WHERE clicked_at::date = CURRENT_DATE - 1
                    UNION
                    SELECT link_type FROM seo_link_impressions WHERE viewed_at::date = CURRENT_DATE - 1
                ) t
                LEFT JOIN (
                    SELECT link_type, COUNT(*) AS clicks, COUNT(DISTINCT session_id) AS sessions
                    FROM seo_link_clicks WHERE clicked_at::date = CURRENT_DATE - 1
                    GROUP BY link_type
                ) c ON c.link_type = t.link_type
                LEFT JOIN (
                    SELECT link_type, SUM(link_count) AS impressions
                    FROM seo_link_impressions WHERE viewed_at::date = CURRENT_DATE - 1
                    GROUP BY link_type
                ) i ON i.link_type = t.link_type;
            END;
            $$ LANGUAGE plpgsql;
            "#,
            name = self.aggregation_routine
        );
        sqlx::query(&routine).execute(&self.pool).await?;

        info!("Event store migrations applied");
        Ok(())
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert_click(&self, record: &ClickRecord) -> Result<()> {
        let event = &record.event;
        sqlx::query(
            r#"
            INSERT INTO seo_link_clicks (
                link_type, source_url, destination_url, anchor_text, link_position,
                session_id, user_id, device_type, user_agent, referer,
                verb_id, noun_id, formula, target_gamme_id, clicked_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(&event.link_type)
        .bind(&event.source_url)
        .bind(&event.destination_url)
        .bind(&event.anchor_text)
        .bind(event.position)
        .bind(&event.session_id)
        .bind(&event.user_id)
        .bind(event.device_type.map(|d| d.as_str()))
        .bind(&event.user_agent)
        .bind(&event.referer)
        .bind(event.verb_id)
        .bind(event.noun_id)
        .bind(&event.formula)
        .bind(event.target_gamme_id)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_impression(&self, record: &ImpressionRecord) -> Result<()> {
        let event = &record.event;
        sqlx::query(
            r#"
            INSERT INTO seo_link_impressions (link_type, page_url, link_count, session_id, viewed_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&event.link_type)
        .bind(&event.page_url)
        .bind(event.link_count)
        .bind(&event.session_id)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn click_stats(
        &self,
        link_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ClickStats> {
        let totals = sqlx::query(
            r#"
            SELECT COUNT(*)::BIGINT AS total, COUNT(DISTINCT session_id)::BIGINT AS sessions
            FROM seo_link_clicks
            WHERE link_type = $1 AND clicked_at BETWEEN $2 AND $3
            "#,
        )
        .bind(link_type)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let destinations = sqlx::query(
            r#"
            SELECT destination_url, COUNT(*)::BIGINT AS clicks
            FROM seo_link_clicks
            WHERE link_type = $1 AND clicked_at BETWEEN $2 AND $3
            GROUP BY destination_url
            ORDER BY clicks DESC, destination_url
            LIMIT $4
            "#,
        )
        .bind(link_type)
        .bind(start)
        .bind(end)
        .bind(TOP_DESTINATIONS_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        let devices = sqlx::query(
            r#"
            SELECT COALESCE(device_type, 'unknown') AS device, COUNT(*)::BIGINT AS clicks
            FROM seo_link_clicks
            WHERE link_type = $1 AND clicked_at BETWEEN $2 AND $3
            GROUP BY 1
            "#,
        )
        .bind(link_type)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(ClickStats {
            total_clicks: totals.get("total"),
            unique_sessions: totals.get("sessions"),
            top_destinations: destinations
                .iter()
                .map(|row| DestinationCount {
                    url: row.get("destination_url"),
                    clicks: row.get("clicks"),
                })
                .collect(),
            clicks_by_device: devices
                .iter()
                .map(|row| (row.get("device"), row.get("clicks")))
                .collect(),
        })
    }

    async fn sum_impressions(
        &self,
        link_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(link_count), 0)::BIGINT
            FROM seo_link_impressions
            WHERE link_type = $1 AND viewed_at BETWEEN $2 AND $3
            "#,
        )
        .bind(link_type)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn run_daily_aggregation(&self, day: NaiveDate) -> Result<NaiveDate> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET LOCAL TIME ZONE 'UTC'").execute(&mut *tx).await?;

        let summarized: NaiveDate = sqlx::query_scalar(AGGREGATION_DAY_SQL)
            .fetch_one(&mut *tx)
            .await?;
        if summarized != day {
            return Err(Error::InvalidInput(format!(
                "{} only summarizes {summarized}, cannot aggregate {day}",
                self.aggregation_routine
            )));
        }

        let call = format!("SELECT {}()", self.aggregation_routine);
        sqlx::query(&call).execute(&mut *tx).await?;
        let recorded: NaiveDate = sqlx::query_scalar(RECORD_RUN_SQL).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(recorded)
    }

    async fn last_aggregated_day(&self) -> Result<Option<NaiveDate>> {
        let day: Option<NaiveDate> =
            sqlx::query_scalar("SELECT MAX(day) FROM seo_link_aggregation_runs")
                .fetch_one(&self.pool)
                .await?;
        Ok(day)
    }

    async fn delete_clicks_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM seo_link_clicks WHERE clicked_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_impressions_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM seo_link_impressions WHERE viewed_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
