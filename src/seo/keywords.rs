use super::types::{join_non_empty, SeoContext};

/// Marketing suffixes appended to the family name
const KEYWORD_SUFFIXES: [&str; 2] = ["pas cher", "prix"];

/// Comma-separated keyword list for the pair.
///
/// Pure function of the context; recomputed on every call.
pub fn generate_keywords(ctx: &SeoContext) -> String {
    let gamme = ctx.gamme_name.trim();
    let marque = ctx.marque_name.trim();
    let modele = ctx.modele_name.trim();
    let type_name = ctx.type_name.trim();

    let mut keywords: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !keywords.iter().any(|k| k.eq_ignore_ascii_case(&candidate)) {
            keywords.push(candidate);
        }
    };

    push(gamme.to_string());
    push(join_non_empty(&[gamme, marque]));
    push(join_non_empty(&[gamme, marque, modele]));
    push(join_non_empty(&[gamme, marque, modele, type_name]));
    push(join_non_empty(&[marque, modele]));
    push(join_non_empty(&[marque, modele, type_name]));
    if let Some(family) = ctx.family_name.as_deref() {
        push(join_non_empty(&[family, marque]));
    }
    if !gamme.is_empty() {
        for suffix in KEYWORD_SUFFIXES {
            push(format!("{} {}", gamme, suffix));
        }
    }

    keywords.join(", ")
}
