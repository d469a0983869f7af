//! Template lookup by product family
//!
//! Templates are edited through the admin screens; this side only reads them.

use super::types::SeoTemplates;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read-only source of raw templates
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Templates for family `pg_id`, `None` if the family has none
    async fn templates_for_family(&self, pg_id: i64) -> Result<Option<SeoTemplates>>;
}

/// HashMap-backed template source for tests and fixtures
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateSource {
    templates: Arc<RwLock<HashMap<i64, SeoTemplates>>>,
}

impl MemoryTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, pg_id: i64, templates: SeoTemplates) {
        self.templates.write().await.insert(pg_id, templates);
    }
}

#[async_trait]
impl TemplateSource for MemoryTemplateSource {
    async fn templates_for_family(&self, pg_id: i64) -> Result<Option<SeoTemplates>> {
        Ok(self.templates.read().await.get(&pg_id).cloned())
    }
}

#[cfg(feature = "postgresql-backend")]
pub use self::postgres::PgTemplateSource;

#[cfg(feature = "postgresql-backend")]
mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    /// Reads `seo_gamme_car_templates`
    #[derive(Debug, Clone)]
    pub struct PgTemplateSource {
        pool: PgPool,
    }

    impl PgTemplateSource {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl TemplateSource for PgTemplateSource {
        async fn templates_for_family(&self, pg_id: i64) -> Result<Option<SeoTemplates>> {
            let row = sqlx::query(
                r#"
                SELECT sgc_h1, sgc_title, sgc_descrip, sgc_content, sgc_preview
                FROM seo_gamme_car_templates
                WHERE sgc_pg_id = $1
                "#,
            )
            .bind(pg_id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.map(|row| SeoTemplates {
                h1: row.get::<Option<String>, _>("sgc_h1").unwrap_or_default(),
                title: row.get::<Option<String>, _>("sgc_title").unwrap_or_default(),
                description: row
                    .get::<Option<String>, _>("sgc_descrip")
                    .unwrap_or_default(),
                content: row
                    .get::<Option<String>, _>("sgc_content")
                    .unwrap_or_default(),
                preview: row
                    .get::<Option<String>, _>("sgc_preview")
                    .unwrap_or_default(),
            }))
        }
    }
}
