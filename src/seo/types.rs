//! Input and output records of the content engine

use serde::{Deserialize, Serialize};

/// One (vehicle type, product family) pair as returned by the catalog lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoContext {
    pub type_id: i64,
    pub pg_id: i64,
    /// Parent family (catalog section) of the product family
    pub family_id: Option<i64>,

    pub marque_id: Option<i64>,
    pub marque_name: String,
    pub marque_alias: Option<String>,
    pub modele_id: Option<i64>,
    pub modele_name: String,
    pub modele_alias: Option<String>,
    pub type_name: String,
    pub type_alias: Option<String>,
    pub gamme_name: String,
    pub gamme_alias: Option<String>,
    pub family_name: Option<String>,

    pub min_price: Option<f64>,
    /// Number of matching parts
    pub count: Option<u32>,
    pub year_from: Option<String>,
    pub year_to: Option<String>,
    pub motor_codes: Option<String>,
    pub fuel: Option<String>,
    pub power_ps: Option<String>,
    pub power_kw: Option<String>,
}

impl SeoContext {
    /// "BMW Série 3 (E46) 320 d"
    pub fn vehicle_label(&self) -> String {
        join_non_empty(&[
            self.marque_name.as_str(),
            self.modele_name.as_str(),
            self.type_name.as_str(),
        ])
    }
}

pub(crate) fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Operator-authored raw templates for one product family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoTemplates {
    pub h1: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub preview: String,
}

/// Fully expanded SEO fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSeo {
    pub h1: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub preview: String,
    pub keywords: String,
    /// `false` only when the deterministic fallback was served
    pub success: bool,
}

/// Which template field is being expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeoField {
    H1,
    Title,
    Description,
    Content,
    Preview,
}

impl SeoField {
    pub const ALL: [SeoField; 5] = [
        SeoField::H1,
        SeoField::Title,
        SeoField::Description,
        SeoField::Content,
        SeoField::Preview,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SeoField::H1 => "h1",
            SeoField::Title => "title",
            SeoField::Description => "description",
            SeoField::Content => "content",
            SeoField::Preview => "preview",
        }
    }
}

impl SeoTemplates {
    pub fn field(&self, field: SeoField) -> &str {
        match field {
            SeoField::H1 => &self.h1,
            SeoField::Title => &self.title,
            SeoField::Description => &self.description,
            SeoField::Content => &self.content,
            SeoField::Preview => &self.preview,
        }
    }
}
