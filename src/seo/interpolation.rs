//! Placeholder expansion
//!
//! Two dialects coexist in operator templates:
//!
//! - modern `%snake_case%` variables, where an unknown name expands to nothing
//! - legacy `#PascalCase#` variables, where an unknown name is left for the
//!   static switch pass (it may be a macro such as `#VousPropose#`)
//!
//! Both passes read from value maps built once per context, so each dialect
//! can be exercised on its own.

use super::types::{join_non_empty, SeoContext};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Bare variable name (no delimiters) to expanded value
pub type ValueMap = HashMap<&'static str, String>;

static MODERN_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([a-z][a-z0-9_]*)%").expect("modern token regex"));

static LEGACY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z][A-Za-z0-9_]*)#").expect("legacy token regex"));

/// "118.45€", empty for a missing or non-positive price
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) if p.is_finite() && p > 0.0 => format!("{:.2}€", p),
        _ => String::new(),
    }
}

/// "95 ch", empty when unknown
pub fn format_power(power_ps: Option<&str>) -> String {
    match power_ps.map(str::trim) {
        Some(p) if !p.is_empty() => format!("{} ch", p),
        _ => String::new(),
    }
}

/// "1998-2001", "depuis 1998", "jusqu'à 2001" or empty
pub fn format_years(year_from: Option<&str>, year_to: Option<&str>) -> String {
    let from = year_from.map(str::trim).filter(|y| !y.is_empty());
    let to = year_to.map(str::trim).filter(|y| !y.is_empty());
    match (from, to) {
        (Some(from), Some(to)) => format!("{}-{}", from, to),
        (Some(from), None) => format!("depuis {}", from),
        (None, Some(to)) => format!("jusqu'à {}", to),
        (None, None) => String::new(),
    }
}

fn opt(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn opt_id(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Values for the `%name%` dialect
pub fn modern_values(ctx: &SeoContext) -> ValueMap {
    let mut values = ValueMap::new();
    let price = format_price(ctx.min_price);
    let years = format_years(ctx.year_from.as_deref(), ctx.year_to.as_deref());

    values.insert("type_id", ctx.type_id.to_string());
    values.insert("pg_id", ctx.pg_id.to_string());
    values.insert("family_id", opt_id(ctx.family_id));

    values.insert("marque_name", ctx.marque_name.clone());
    values.insert("marque", ctx.marque_name.clone());
    values.insert("marque_alias", opt(&ctx.marque_alias));
    values.insert("modele_name", ctx.modele_name.clone());
    values.insert("modele", ctx.modele_name.clone());
    values.insert("modele_alias", opt(&ctx.modele_alias));
    values.insert("type_name", ctx.type_name.clone());
    values.insert("type", ctx.type_name.clone());
    values.insert("type_alias", opt(&ctx.type_alias));
    values.insert("gamme_name", ctx.gamme_name.clone());
    values.insert("gamme", ctx.gamme_name.clone());
    values.insert("gamme_alias", opt(&ctx.gamme_alias));
    values.insert("family_name", opt(&ctx.family_name));
    values.insert("vehicle", ctx.vehicle_label());

    values.insert("min_price", price.clone());
    values.insert("price", price);
    values.insert("count", ctx.count.map(|c| c.to_string()).unwrap_or_default());
    values.insert("year_from", opt(&ctx.year_from));
    values.insert("year_to", opt(&ctx.year_to));
    values.insert("years", years);
    values.insert("motor_codes", opt(&ctx.motor_codes));
    values.insert("fuel", opt(&ctx.fuel));
    values.insert("power_ps", opt(&ctx.power_ps));
    values.insert("power_kw", opt(&ctx.power_kw));
    values.insert("power", format_power(ctx.power_ps.as_deref()));

    values
}

/// Values for the `#Name#` dialect; same data, legacy names and phrasing
pub fn legacy_values(ctx: &SeoContext) -> ValueMap {
    let mut values = ValueMap::new();
    let price = format_price(ctx.min_price);

    values.insert("Gamme", ctx.gamme_name.clone());
    values.insert("GammeAlias", opt(&ctx.gamme_alias));
    values.insert("Famille", opt(&ctx.family_name));
    values.insert("VMarque", ctx.marque_name.clone());
    values.insert("MarqueAlias", opt(&ctx.marque_alias));
    values.insert("VModele", ctx.modele_name.clone());
    values.insert("ModeleAlias", opt(&ctx.modele_alias));
    values.insert("VType", ctx.type_name.clone());
    values.insert("TypeAlias", opt(&ctx.type_alias));
    values.insert("VVehicule", ctx.vehicle_label());
    values.insert("VNbCh", opt(&ctx.power_ps));
    values.insert("VKw", opt(&ctx.power_kw));
    values.insert(
        "VAnnee",
        format_years(ctx.year_from.as_deref(), ctx.year_to.as_deref()),
    );
    values.insert("VAnneeDebut", opt(&ctx.year_from));
    values.insert("VAnneeFin", opt(&ctx.year_to));
    values.insert("VCarburant", opt(&ctx.fuel));
    values.insert("VCodeMoteur", opt(&ctx.motor_codes));
    values.insert("NbPieces", ctx.count.map(|c| c.to_string()).unwrap_or_default());
    values.insert(
        "MinPrice",
        if price.is_empty() {
            String::new()
        } else {
            format!("à partir de {}", price)
        },
    );
    values.insert("Prix", price);

    values
}

/// Single pass over `%name%` tokens; unknown names become empty
pub fn apply_modern(template: &str, values: &ValueMap) -> String {
    MODERN_TOKEN
        .replace_all(template, |caps: &Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Single pass over `#Name#` tokens; unknown names are kept verbatim
pub fn apply_legacy(template: &str, values: &ValueMap) -> String {
    LEGACY_TOKEN
        .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Collapse runs of whitespace to one space and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Leftover `%name%` tokens
pub fn modern_tokens(text: &str) -> Vec<String> {
    MODERN_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Leftover `#Name#` tokens
pub fn legacy_tokens(text: &str) -> Vec<String> {
    LEGACY_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Fallback text for a field, built without regexes or I/O
pub(crate) fn plain_label(ctx: &SeoContext) -> String {
    join_non_empty(&[
        ctx.gamme_name.as_str(),
        ctx.marque_name.as_str(),
        ctx.modele_name.as_str(),
        ctx.type_name.as_str(),
    ])
}
