use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound for any day count taken from configuration
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub log_level: String,
    /// "text" or "json"
    pub log_format: String,
    pub log_dir: Option<String>,
    /// "daily", "hourly" or "never"
    pub log_rotation: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            log_dir: None,
            log_rotation: "daily".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// "memory" or "redis"
    pub backend: String,
    pub redis_url: Option<String>,
    pub seo_ttl_seconds: u64,
    pub metrics_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            redis_url: None,
            seo_ttl_seconds: 24 * 60 * 60,
            metrics_ttl_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// "memory" or "postgres"
    pub backend: String,
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            url: None,
            max_connections: 10,
        }
    }
}

/// What happens when a page carries more internal links than its ceiling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    /// Warn and keep every link
    #[default]
    LogOnly,
    /// Render links beyond the ceiling as plain text
    Truncate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinksConfig {
    pub blog_max_links: usize,
    pub page_max_links: usize,
    pub budget_mode: BudgetMode,
    pub preserve_markers_in_content: bool,
    pub base_path: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            blog_max_links: 5,
            page_max_links: 10,
            budget_mode: BudgetMode::LogOnly,
            preserve_markers_in_content: true,
            base_path: "/pieces".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub default_window_days: i64,
    pub retention_days: i64,
    pub known_link_types: Vec<String>,
    pub aggregation_routine: String,
    pub require_aggregation_before_cleanup: bool,
    /// Client event timestamps further than this from server time are
    /// replaced by server time
    pub max_clock_skew_seconds: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            default_window_days: 30,
            retention_days: 90,
            known_link_types: [
                "LinkGammeCar",
                "LinkGamme",
                "CrossSelling",
                "VoirAussi",
                "Footer",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            aggregation_routine: "aggregate_seo_link_metrics_daily".to_string(),
            require_aggregation_before_cleanup: true,
            max_clock_skew_seconds: 3600,
        }
    }
}

impl EngineConfig {
    /// Load defaults, then the first config file found, then `SEO__*` env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let defaults = EngineConfig::default();
        settings = settings.add_source(config::Config::try_from(&defaults)?);

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let config_paths = ["seo-engine.toml", "config/seo-engine.toml"];
                for candidate in &config_paths {
                    if Path::new(candidate).exists() {
                        tracing::debug!("loading config file {}", candidate);
                        settings = settings.add_source(config::File::with_name(candidate));
                        break;
                    }
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SEO")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("tracking.known_link_types")
                .try_parsing(true),
        );

        let config: EngineConfig = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no component can run with
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.tracking.retention_days) {
            return Err(Error::Config(format!(
                "tracking.retention_days must be between 1 and {MAX_WINDOW_DAYS}"
            )));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.tracking.default_window_days) {
            return Err(Error::Config(format!(
                "tracking.default_window_days must be between 1 and {MAX_WINDOW_DAYS}"
            )));
        }
        if !(0..=86_400).contains(&self.tracking.max_clock_skew_seconds) {
            return Err(Error::Config(
                "tracking.max_clock_skew_seconds must be between 0 and 86400".to_string(),
            ));
        }
        if self.cache.backend == "redis" && self.cache.redis_url.is_none() {
            return Err(Error::Config(
                "cache.redis_url is required for the redis backend".to_string(),
            ));
        }
        if self.database.backend == "postgres" && self.database.url.is_none() {
            return Err(Error::Config(
                "database.url is required for the postgres backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Render a commented sample config file
    pub fn sample_toml() -> Result<String> {
        let body = toml::to_string_pretty(&EngineConfig::default())
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(format!(
            "# seo-engine configuration\n#\n# Every key can be overridden from the environment, e.g.\n# SEO__LINKS__BUDGET_MODE=truncate\n\n{}",
            body
        ))
    }
}
