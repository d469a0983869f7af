//! Internal link injection
//!
//! Rewrites `#LinkGammeCar_<id>#` and `#LinkGamme_<id>#` markers into anchor
//! tags. Anchor text is a verb + noun formula picked by the variation
//! selector, and the indices used are returned so that a later click can be
//! attributed to the exact wording shown.

use super::catalog::{family_url, vehicle_family_url, FamilyTarget, LinkCatalog};
use super::roles::{PageRole, SourcePage};
use crate::config::{BudgetMode, LinksConfig};
use crate::seo::types::join_non_empty;
use crate::seo::{LinkMarker, RotationTable, SeoContext};
use ammonia::clean_text;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

pub const LINK_CLASS: &str = "seo-internal-link";
const LINK_CLASS_ATTR: &str = "class=\"seo-internal-link\"";

pub const VERB_OFFSET: i64 = 0;
pub const NOUN_OFFSET: i64 = 1;

static LINK_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#(LinkGammeCar_[0-9]+|LinkGamme_[0-9]+)#").expect("link marker regex")
});

static VERBS: LazyLock<RotationTable> = LazyLock::new(|| {
    RotationTable::from_static(
        "link_verbs",
        &["Achetez", "Commandez", "Découvrez", "Trouvez", "Choisissez"],
    )
});

/// `{gamme}` and `{vehicle}` are filled per link
static VEHICLE_NOUNS: LazyLock<RotationTable> = LazyLock::new(|| {
    RotationTable::from_static(
        "link_nouns_vehicle",
        &[
            "{gamme} {vehicle}",
            "{gamme} pour {vehicle}",
            "{gamme} {marque} {modele}",
            "{gamme} adapté à votre {marque} {modele}",
        ],
    )
});

static FAMILY_NOUNS: LazyLock<RotationTable> = LazyLock::new(|| {
    RotationTable::from_static(
        "link_nouns_family",
        &[
            "{gamme}",
            "{gamme} pas cher",
            "{gamme} de qualité",
            "{gamme} au meilleur prix",
        ],
    )
});

/// Which rotation entries produced one injected anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFormula {
    pub link_type: String,
    pub verb_id: usize,
    pub noun_id: usize,
    /// `V<verb>-N<noun>`
    pub formula: String,
    pub target_id: i64,
    pub url: String,
    pub anchor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInjectionResult {
    pub content: String,
    pub links_injected: usize,
    pub formulas: Vec<LinkFormula>,
    /// Markers removed or rendered as plain text
    pub links_dropped: usize,
    /// Total internal links on the page exceed the ceiling
    pub over_budget: bool,
}

enum Resolution {
    Link { html: String, formula: LinkFormula },
    Plain(String),
    Remove,
}

/// Rewrites link markers using a catalog lookup
#[derive(Clone)]
pub struct LinkInjector {
    catalog: Arc<dyn LinkCatalog>,
    config: LinksConfig,
}

impl LinkInjector {
    pub fn new(catalog: Arc<dyn LinkCatalog>, config: LinksConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &LinksConfig {
        &self.config
    }

    /// Link ceiling for the page the content is rendered on
    pub fn ceiling_for(&self, source: &SourcePage) -> usize {
        match source.role {
            Some(role) if role.is_editorial() => self.config.blog_max_links,
            _ => self.config.page_max_links,
        }
    }

    pub fn has_markers(content: &str) -> bool {
        LINK_MARKER.is_match(content)
    }

    /// Replace every marker in `content`
    pub async fn inject(&self, content: &str, ctx: &SeoContext, source: &SourcePage) -> LinkInjectionResult {
        let ceiling = self.ceiling_for(source);
        let existing = count_internal_links(content);
        let mut targets: HashMap<i64, Option<FamilyTarget>> = HashMap::new();

        let mut result = LinkInjectionResult::default();
        let mut output = String::with_capacity(content.len());
        let mut last = 0;

        for caps in LINK_MARKER.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            output.push_str(&content[last..whole.start()]);
            last = whole.end();

            let Some(marker) = LinkMarker::parse(name.as_str()) else {
                result.links_dropped += 1;
                continue;
            };

            let target_id = marker.target_id();
            if !targets.contains_key(&target_id) {
                let target = match self.catalog.family(target_id).await {
                    Ok(target) => target,
                    Err(e) => {
                        warn!(target_id, error = %e, "link target lookup failed");
                        None
                    }
                };
                targets.insert(target_id, target);
            }
            let target = targets.get(&target_id).and_then(Option::as_ref);

            let within_budget = existing + result.links_injected < ceiling;
            let truncate = self.config.budget_mode == BudgetMode::Truncate && !within_budget;

            match self.resolve(marker, target, ctx, source, truncate) {
                Resolution::Link { html, formula } => {
                    output.push_str(&html);
                    result.formulas.push(formula);
                    result.links_injected += 1;
                }
                Resolution::Plain(text) => {
                    output.push_str(&clean_text(&text));
                    result.links_dropped += 1;
                }
                Resolution::Remove => {
                    result.links_dropped += 1;
                }
            }
        }
        output.push_str(&content[last..]);

        let total = count_internal_links(&output);
        if total > ceiling {
            result.over_budget = true;
            warn!(
                total,
                ceiling,
                role = ?source.role,
                "internal link budget exceeded"
            );
        }

        debug!(
            injected = result.links_injected,
            dropped = result.links_dropped,
            "link injection complete"
        );
        result.content = output;
        result
    }

    fn resolve(
        &self,
        marker: LinkMarker,
        target: Option<&FamilyTarget>,
        ctx: &SeoContext,
        source: &SourcePage,
        truncate: bool,
    ) -> Resolution {
        let Some(target) = target else {
            debug!(target_id = marker.target_id(), "unknown link target");
            return Resolution::Remove;
        };

        let base = self.config.base_path.as_str();
        let (url, role, nouns, type_id) = match marker {
            LinkMarker::GammeCar(_) => match vehicle_family_url(base, target, ctx) {
                Some(url) => (url, PageRole::VehicleFamily, &*VEHICLE_NOUNS, ctx.type_id),
                None => return Resolution::Remove,
            },
            LinkMarker::Gamme(_) => (
                family_url(base, target),
                PageRole::Family,
                &*FAMILY_NOUNS,
                ctx.type_id,
            ),
        };

        let (noun_id, noun_template) = nouns.select_with_index(type_id, target.pg_id, NOUN_OFFSET);
        let noun = fill_noun(noun_template, target, ctx);

        if !source.allows(role) || source.is_same_url(&url) {
            debug!(url = %url, ?role, "link rejected by role policy");
            return Resolution::Plain(noun);
        }
        if truncate {
            return Resolution::Plain(noun);
        }

        let (verb_id, verb) = VERBS.select_with_index(type_id, target.pg_id, VERB_OFFSET);
        let anchor = format!("{} {}", verb, noun);
        let formula = LinkFormula {
            link_type: marker.link_type().to_string(),
            verb_id,
            noun_id,
            formula: format!("V{}-N{}", verb_id, noun_id),
            target_id: target.pg_id,
            url,
            anchor,
        };
        let html = format!(
            "<a href=\"{}\" {} data-link-type=\"{}\" data-formula=\"{}\" data-target-id=\"{}\">{}</a>",
            clean_text(&formula.url),
            LINK_CLASS_ATTR,
            formula.link_type,
            formula.formula,
            formula.target_id,
            clean_text(&formula.anchor)
        );
        Resolution::Link { html, formula }
    }
}

fn fill_noun(template: &str, target: &FamilyTarget, ctx: &SeoContext) -> String {
    let filled = template
        .replace("{gamme}", &target.name)
        .replace("{vehicle}", &ctx.vehicle_label())
        .replace("{marque}", &ctx.marque_name)
        .replace("{modele}", &ctx.modele_name);
    join_non_empty(&filled.split_whitespace().collect::<Vec<_>>())
}

/// Number of anchors carrying the internal-link class
pub fn count_internal_links(html: &str) -> usize {
    html.matches(LINK_CLASS_ATTR).count()
}
