//! Template processing with read-through caching
//!
//! `SeoProcessor::process_templates` is the entry point used by page
//! rendering. It never fails: cache trouble degrades to recomputation and an
//! expansion error degrades to the deterministic fallback.

use super::interpolation::{
    apply_legacy, apply_modern, collapse_whitespace, legacy_tokens, legacy_values, modern_tokens,
    modern_values, plain_label, ValueMap,
};
use super::keywords::generate_keywords;
use super::switches::{apply_static_switches, LinkMarker};
use super::templates::TemplateSource;
use super::types::{ProcessedSeo, SeoContext, SeoField, SeoTemplates};
use crate::cache::{CacheExt, SharedCache};
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_SEO_TTL_SECONDS: u64 = 24 * 60 * 60;
const CACHE_PREFIX: &str = "seo:processed";

/// Expands operator templates for a (vehicle, family) pair
#[derive(Clone)]
pub struct SeoProcessor {
    cache: SharedCache,
    template_source: Option<Arc<dyn TemplateSource>>,
    ttl_seconds: u64,
    preserve_markers_in_content: bool,
}

impl std::fmt::Debug for SeoProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeoProcessor")
            .field("cache", &self.cache)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("preserve_markers_in_content", &self.preserve_markers_in_content)
            .finish()
    }
}

/// Both value maps for one context, built once per call
struct FieldExpander<'a> {
    ctx: &'a SeoContext,
    modern: ValueMap,
    legacy: ValueMap,
}

impl<'a> FieldExpander<'a> {
    fn new(ctx: &'a SeoContext) -> Self {
        Self {
            ctx,
            modern: modern_values(ctx),
            legacy: legacy_values(ctx),
        }
    }

    fn expand(&self, template: &str, preserve_link_markers: bool) -> Result<String> {
        let text = apply_modern(template, &self.modern);
        let text = apply_legacy(&text, &self.legacy);
        let text = apply_static_switches(&text, self.ctx, preserve_link_markers);
        let text = collapse_whitespace(&text);
        ensure_no_placeholders(&text, preserve_link_markers)?;
        Ok(text)
    }
}

fn ensure_no_placeholders(text: &str, link_markers_allowed: bool) -> Result<()> {
    let mut leaked = modern_tokens(text);
    leaked.extend(legacy_tokens(text).into_iter().filter(|token| {
        let name = token.trim_matches('#');
        !(link_markers_allowed && LinkMarker::parse(name).is_some())
    }));

    if leaked.is_empty() {
        Ok(())
    } else {
        Err(Error::Template(format!(
            "unresolved placeholders: {}",
            leaked.join(", ")
        )))
    }
}

impl SeoProcessor {
    pub fn new(cache: SharedCache) -> Self {
        Self {
            cache,
            template_source: None,
            ttl_seconds: DEFAULT_SEO_TTL_SECONDS,
            preserve_markers_in_content: true,
        }
    }

    pub fn with_template_source(mut self, source: Arc<dyn TemplateSource>) -> Self {
        self.template_source = Some(source);
        self
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Keep `#LinkGammeCar_<id>#`/`#LinkGamme_<id>#` in `content` for the injector
    pub fn with_link_markers(mut self, preserve: bool) -> Self {
        self.preserve_markers_in_content = preserve;
        self
    }

    /// `seo:processed:<pg_id>:<type_id>`
    pub fn cache_key(pg_id: i64, type_id: i64) -> String {
        format!("{}:{}:{}", CACHE_PREFIX, pg_id, type_id)
    }

    /// Expand all five fields, serving from cache when possible.
    ///
    /// A cached entry is returned as-is apart from `keywords`, which are
    /// regenerated on every call. Edited templates only show up after
    /// [`SeoProcessor::invalidate_cache`].
    pub async fn process_templates(&self, templates: &SeoTemplates, ctx: &SeoContext) -> ProcessedSeo {
        let key = Self::cache_key(ctx.pg_id, ctx.type_id);

        match self.cache.get::<ProcessedSeo>(&key).await {
            Ok(Some(mut cached)) => {
                debug!(key = %key, "processed SEO cache hit");
                cached.keywords = generate_keywords(ctx);
                return cached;
            }
            Ok(None) => debug!(key = %key, "processed SEO cache miss"),
            Err(e) => warn!(key = %key, error = %e, "cache read failed, recomputing"),
        }

        match self.expand_all(templates, ctx) {
            Ok(processed) => {
                if let Err(e) = self.cache.set(&key, &processed, self.ttl_seconds).await {
                    warn!(key = %key, error = %e, "cache write failed");
                }
                processed
            }
            Err(e) => {
                warn!(
                    pg_id = ctx.pg_id,
                    type_id = ctx.type_id,
                    error = %e,
                    "template processing failed, serving fallback"
                );
                Self::fallback(ctx)
            }
        }
    }

    /// Expand a single template string. Link markers are flattened to text.
    pub fn process_template(&self, template: &str, ctx: &SeoContext) -> Result<String> {
        FieldExpander::new(ctx).expand(template, false)
    }

    /// Look up the family's templates, then process them. A missing entry
    /// or a store failure is treated as empty templates.
    pub async fn process_for_family(&self, ctx: &SeoContext) -> ProcessedSeo {
        let templates = match &self.template_source {
            Some(source) => match source.templates_for_family(ctx.pg_id).await {
                Ok(Some(templates)) => templates,
                Ok(None) => {
                    debug!(pg_id = ctx.pg_id, "no templates for family");
                    SeoTemplates::default()
                }
                Err(e) => {
                    warn!(pg_id = ctx.pg_id, error = %e, "template lookup failed");
                    SeoTemplates::default()
                }
            },
            None => SeoTemplates::default(),
        };
        self.process_templates(&templates, ctx).await
    }

    fn expand_all(&self, templates: &SeoTemplates, ctx: &SeoContext) -> Result<ProcessedSeo> {
        let expander = FieldExpander::new(ctx);
        let mut out = ProcessedSeo {
            keywords: generate_keywords(ctx),
            success: true,
            ..Default::default()
        };

        for field in SeoField::ALL {
            let preserve = field == SeoField::Content && self.preserve_markers_in_content;
            let value = expander
                .expand(templates.field(field), preserve)
                .map_err(|e| Error::Template(format!("{}: {}", field.name(), e)))?;
            match field {
                SeoField::H1 => out.h1 = value,
                SeoField::Title => out.title = value,
                SeoField::Description => out.description = value,
                SeoField::Content => out.content = value,
                SeoField::Preview => out.preview = value,
            }
        }

        Ok(out)
    }

    /// Deterministic default built from display names only. Infallible and
    /// free of I/O.
    pub fn fallback(ctx: &SeoContext) -> ProcessedSeo {
        let label = plain_label(ctx);
        let label = if label.is_empty() {
            "Pièces auto".to_string()
        } else {
            label
        };
        let description = format!("Achetez {} au meilleur prix.", label);

        ProcessedSeo {
            h1: label.clone(),
            title: label.clone(),
            content: description.clone(),
            description,
            preview: label,
            keywords: generate_keywords(ctx),
            success: false,
        }
    }

    /// Drop the cached entry for one pair, or for every vehicle of `pg_id`
    pub async fn invalidate_cache(&self, pg_id: i64, type_id: Option<i64>) -> Result<u64> {
        let removed = match type_id {
            Some(type_id) => u64::from(self.cache.del(&Self::cache_key(pg_id, type_id)).await?),
            None => {
                self.cache
                    .clear_by_pattern(&format!("{}:{}:*", CACHE_PREFIX, pg_id))
                    .await?
            }
        };
        debug!(pg_id, ?type_id, removed, "invalidated processed SEO cache");
        Ok(removed)
    }
}
