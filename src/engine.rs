//! Component wiring from configuration

use std::sync::Arc;
use tracing::info;

use crate::cache::{self, SharedCache};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::http_server::AppState;
use crate::links::{LinkCatalog, LinkInjector, SeoRenderer};
use crate::seo::{SeoProcessor, TemplateSource};
use crate::tracking::{LinkTrackingService, SharedEventStore};

/// Backends behind the three collaborator seams
#[derive(Clone)]
pub struct Backends {
    pub cache: SharedCache,
    pub templates: Arc<dyn TemplateSource>,
    pub catalog: Arc<dyn LinkCatalog>,
    pub events: SharedEventStore,
}

impl Backends {
    /// Open the backends named in the configuration
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let cache = cache::from_config(&config.cache).await?;
        match config.database.backend.as_str() {
            "memory" => Ok(Self::in_memory(cache)),
            #[cfg(feature = "postgresql-backend")]
            "postgres" => Self::postgres(config, cache).await,
            other => Err(Error::Config(format!("unsupported database backend: {other}"))),
        }
    }

    pub fn in_memory(cache: SharedCache) -> Self {
        Self {
            cache,
            templates: Arc::new(crate::seo::MemoryTemplateSource::new()),
            catalog: Arc::new(crate::links::MemoryLinkCatalog::new()),
            events: Arc::new(crate::tracking::MemoryEventStore::new()),
        }
    }

    #[cfg(feature = "postgresql-backend")]
    async fn postgres(config: &EngineConfig, cache: SharedCache) -> Result<Self> {
        use sqlx::postgres::PgPoolOptions;

        let url = config
            .database
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("database.url is not set".to_string()))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(url)
            .await?;

        let events = crate::tracking::PgEventStore::new(pool.clone(), &config.tracking.aggregation_routine)?;
        events.run_migrations().await?;
        info!("Connected to PostgreSQL");

        Ok(Self {
            cache,
            templates: Arc::new(crate::seo::PgTemplateSource::new(pool.clone())),
            catalog: Arc::new(crate::links::PgLinkCatalog::new(pool)),
            events: Arc::new(events),
        })
    }
}

/// Assemble the renderer and tracking service over the given backends
pub fn build_state(config: &EngineConfig, backends: Backends) -> AppState {
    let processor = SeoProcessor::new(backends.cache.clone())
        .with_template_source(backends.templates)
        .with_ttl(config.cache.seo_ttl_seconds)
        .with_link_markers(config.links.preserve_markers_in_content);
    let injector = LinkInjector::new(backends.catalog, config.links.clone());
    let tracking = LinkTrackingService::new(backends.events, backends.cache, config.tracking.clone())
        .with_metrics_ttl(config.cache.metrics_ttl_seconds);

    info!(
        cache = %config.cache.backend,
        database = %config.database.backend,
        budget_mode = ?config.links.budget_mode,
        "SEO engine assembled"
    );

    AppState {
        renderer: SeoRenderer::new(processor, injector),
        tracking,
    }
}
