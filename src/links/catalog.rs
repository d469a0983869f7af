//! Link targets: family lookup and URL construction

use crate::error::Result;
use crate::seo::SeoContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Product family a marker points to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyTarget {
    pub pg_id: i64,
    pub name: String,
    pub alias: Option<String>,
}

impl FamilyTarget {
    pub fn new(pg_id: i64, name: impl Into<String>) -> Self {
        Self {
            pg_id,
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn slug(&self) -> String {
        alias_or_slug(self.alias.as_deref(), &self.name)
    }
}

/// Catalog lookup used to resolve link markers
#[async_trait]
pub trait LinkCatalog: Send + Sync {
    async fn family(&self, pg_id: i64) -> Result<Option<FamilyTarget>>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLinkCatalog {
    families: Arc<RwLock<HashMap<i64, FamilyTarget>>>,
}

impl MemoryLinkCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, target: FamilyTarget) {
        self.families.write().await.insert(target.pg_id, target);
    }
}

#[async_trait]
impl LinkCatalog for MemoryLinkCatalog {
    async fn family(&self, pg_id: i64) -> Result<Option<FamilyTarget>> {
        Ok(self.families.read().await.get(&pg_id).cloned())
    }
}

#[cfg(feature = "postgresql-backend")]
pub use self::postgres::PgLinkCatalog;

#[cfg(feature = "postgresql-backend")]
mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    /// Reads displayable families from `pieces_gamme`
    #[derive(Debug, Clone)]
    pub struct PgLinkCatalog {
        pool: PgPool,
    }

    impl PgLinkCatalog {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl LinkCatalog for PgLinkCatalog {
        async fn family(&self, pg_id: i64) -> Result<Option<FamilyTarget>> {
            let row = sqlx::query(
                r#"
                SELECT pg_id, pg_name, pg_alias
                FROM pieces_gamme
                WHERE pg_id = $1 AND pg_display = true
                "#,
            )
            .bind(pg_id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.map(|row| FamilyTarget {
                pg_id: row.get("pg_id"),
                name: row.get("pg_name"),
                alias: row.get("pg_alias"),
            }))
        }
    }
}

/// `/pieces/<alias>-<pg_id>.html`
pub fn family_url(base_path: &str, target: &FamilyTarget) -> String {
    format!(
        "{}/{}-{}.html",
        base_path.trim_end_matches('/'),
        target.slug(),
        target.pg_id
    )
}

/// `/pieces/<gamme>-<pg>/<marque>-<id>/<modele>-<id>/<type>-<id>.html`,
/// `None` when the context lacks the vehicle ids
pub fn vehicle_family_url(base_path: &str, target: &FamilyTarget, ctx: &SeoContext) -> Option<String> {
    let marque_id = ctx.marque_id?;
    let modele_id = ctx.modele_id?;
    if ctx.type_id <= 0 {
        return None;
    }
    Some(format!(
        "{}/{}-{}/{}-{}/{}-{}/{}-{}.html",
        base_path.trim_end_matches('/'),
        target.slug(),
        target.pg_id,
        alias_or_slug(ctx.marque_alias.as_deref(), &ctx.marque_name),
        marque_id,
        alias_or_slug(ctx.modele_alias.as_deref(), &ctx.modele_name),
        modele_id,
        alias_or_slug(ctx.type_alias.as_deref(), &ctx.type_name),
        ctx.type_id
    ))
}

fn alias_or_slug(alias: Option<&str>, name: &str) -> String {
    match alias.map(str::trim).filter(|a| !a.is_empty()) {
        Some(alias) => alias.to_string(),
        None => slugify(name),
    }
}

/// Lowercase ASCII slug; French accents are folded, everything else
/// non-alphanumeric becomes a single `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        let folded = match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            c => c,
        };
        if folded.is_ascii_alphanumeric() {
            slug.push(folded);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
