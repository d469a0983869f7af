//! Static switch macros
//!
//! Runs after both placeholder passes. Every `#Name#` token still present is
//! either a known macro (replaced), a link marker kept for the injector, or
//! an unresolved macro, which is removed: a blank is preferable to a raw
//! template token in customer-facing text.

use super::interpolation::{format_power, format_years};
use super::types::{join_non_empty, SeoContext};
use super::variation::RotationTable;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

static MACRO_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z][A-Za-z0-9_]*)#").expect("macro token regex"));

pub(crate) static VOUS_PROPOSE: LazyLock<RotationTable> = LazyLock::new(|| {
    RotationTable::from_static(
        "vous_propose",
        &[
            "vous propose",
            "met à votre disposition",
            "vous offre",
            "vous présente",
            "commercialise",
        ],
    )
});

pub(crate) static PRIX_PAS_CHER: LazyLock<RotationTable> = LazyLock::new(|| {
    RotationTable::from_static(
        "prix_pas_cher",
        &[
            "à prix pas cher",
            "à petit prix",
            "au meilleur prix",
            "à prix discount",
            "à tarif réduit",
            "à prix imbattable",
        ],
    )
});

pub const VOUS_PROPOSE_OFFSET: i64 = 0;
pub const PRIX_PAS_CHER_OFFSET: i64 = 3;

/// Kind of link marker understood by the injector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMarker {
    /// `#LinkGammeCar_<pg_id>#`: family page for the current vehicle
    GammeCar(i64),
    /// `#LinkGamme_<pg_id>#`: family page, no vehicle context
    Gamme(i64),
}

impl LinkMarker {
    /// Parse the bare token name (without `#`)
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(id) = name.strip_prefix("LinkGammeCar_") {
            return parse_id(id).map(LinkMarker::GammeCar);
        }
        if let Some(id) = name.strip_prefix("LinkGamme_") {
            return parse_id(id).map(LinkMarker::Gamme);
        }
        None
    }

    pub fn target_id(&self) -> i64 {
        match self {
            LinkMarker::GammeCar(id) | LinkMarker::Gamme(id) => *id,
        }
    }

    /// Link type recorded with click analytics
    pub fn link_type(&self) -> &'static str {
        match self {
            LinkMarker::GammeCar(_) => "LinkGammeCar",
            LinkMarker::Gamme(_) => "LinkGamme",
        }
    }
}

fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Replace static switch macros in `text`.
///
/// With `preserve_link_markers`, `#LinkGammeCar_<id>#` and `#LinkGamme_<id>#`
/// are left in place for the link injector.
pub fn apply_static_switches(text: &str, ctx: &SeoContext, preserve_link_markers: bool) -> String {
    MACRO_TOKEN
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            match resolve_macro(name, ctx, preserve_link_markers) {
                Some(value) => value,
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// `None` keeps the token verbatim
fn resolve_macro(name: &str, ctx: &SeoContext, preserve_link_markers: bool) -> Option<String> {
    let value = match name {
        "Commander" => "commander".to_string(),
        "Controler" => "contrôler".to_string(),
        "VousPropose" => VOUS_PROPOSE
            .select(ctx.type_id, ctx.pg_id, VOUS_PROPOSE_OFFSET)
            .to_string(),
        "PrixPasCher" => PRIX_PAS_CHER
            .select(ctx.type_id, ctx.pg_id, PRIX_PAS_CHER_OFFSET)
            .to_string(),
        "LinkCarAll" => join_non_empty(&[
            ctx.marque_name.as_str(),
            ctx.modele_name.as_str(),
            ctx.type_name.as_str(),
            format_power(ctx.power_ps.as_deref()).as_str(),
            format_years(ctx.year_from.as_deref(), ctx.year_to.as_deref()).as_str(),
        ]),
        "LinkCar" => ctx.vehicle_label(),
        "LinkGammeCar" => join_non_empty(&[ctx.gamme_name.as_str(), ctx.vehicle_label().as_str()]),
        _ => match LinkMarker::parse(name) {
            Some(_) if preserve_link_markers => return None,
            Some(LinkMarker::GammeCar(_)) => {
                join_non_empty(&[ctx.gamme_name.as_str(), ctx.vehicle_label().as_str()])
            }
            Some(LinkMarker::Gamme(_)) => String::new(),
            None => {
                debug!(token = name, "dropping unresolved macro");
                String::new()
            }
        },
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seo::interpolation::collapse_whitespace;

    fn ctx() -> SeoContext {
        SeoContext {
            type_id: 9045,
            pg_id: 4,
            marque_name: "BMW".into(),
            modele_name: "Série 3 (E46)".into(),
            type_name: "320 d".into(),
            gamme_name: "Alternateur".into(),
            power_ps: Some("136".into()),
            year_from: Some("1998".into()),
            year_to: Some("2001".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_fixed_macros() {
        assert_eq!(
            apply_static_switches("#Commander# ou #Controler#", &ctx(), false),
            "commander ou contrôler"
        );
    }

    #[test]
    fn test_rotating_macros_follow_selector() {
        let out = apply_static_switches("#VousPropose#|#PrixPasCher#", &ctx(), false);
        let expected_verb = VOUS_PROPOSE.entries()[(9045 + 4) % 5].clone();
        let expected_price = PRIX_PAS_CHER.entries()[(9045 + 4 + 3) % 6].clone();
        assert_eq!(out, format!("{}|{}", expected_verb, expected_price));
    }

    #[test]
    fn test_vehicle_links() {
        let context = ctx();
        assert_eq!(
            apply_static_switches("#LinkCarAll#", &context, false),
            "BMW Série 3 (E46) 320 d 136 ch 1998-2001"
        );
        assert_eq!(
            apply_static_switches("#LinkCar#", &context, false),
            "BMW Série 3 (E46) 320 d"
        );
        assert_eq!(
            apply_static_switches("#LinkGammeCar_4#", &context, false),
            "Alternateur BMW Série 3 (E46) 320 d"
        );
    }

    #[test]
    fn test_unresolved_macros_vanish() {
        let out = apply_static_switches("Test #CompSwitch_2# et #FamilySwitch_3#", &ctx(), false);
        assert_eq!(collapse_whitespace(&out), "Test et");
        let out = apply_static_switches("#Switch# #LinkFooter# #Whatever#", &ctx(), false);
        assert_eq!(collapse_whitespace(&out), "");
    }

    #[test]
    fn test_link_markers_preserved_on_request() {
        let out = apply_static_switches("voir #LinkGamme_12# et #LinkGammeCar_7#", &ctx(), true);
        assert_eq!(out, "voir #LinkGamme_12# et #LinkGammeCar_7#");
        let out = apply_static_switches("voir #LinkGamme_12#", &ctx(), false);
        assert_eq!(collapse_whitespace(&out), "voir");
    }

    #[test]
    fn test_marker_parsing() {
        assert_eq!(LinkMarker::parse("LinkGammeCar_82"), Some(LinkMarker::GammeCar(82)));
        assert_eq!(LinkMarker::parse("LinkGamme_7"), Some(LinkMarker::Gamme(7)));
        assert_eq!(LinkMarker::parse("LinkGamme_"), None);
        assert_eq!(LinkMarker::parse("LinkGamme_x1"), None);
        assert_eq!(LinkMarker::GammeCar(1).link_type(), "LinkGammeCar");
    }
}
