//! SEO content generation
//!
//! Expands operator-authored templates per (vehicle type, product family)
//! pair. The pipeline for one field is:
//!
//! 1. `%name%` substitution ([`interpolation::apply_modern`])
//! 2. `#Name#` substitution ([`interpolation::apply_legacy`])
//! 3. static switch macros ([`switches::apply_static_switches`])
//! 4. whitespace collapse
//!
//! Rotating phrases are chosen by [`variation`], which is deterministic so
//! that a page reads the same on every crawl.

pub mod interpolation;
pub mod keywords;
pub mod processor;
pub mod switches;
pub mod templates;
pub mod types;
pub mod variation;

pub use keywords::generate_keywords;
pub use processor::SeoProcessor;
pub use switches::LinkMarker;
pub use templates::{MemoryTemplateSource, TemplateSource};
#[cfg(feature = "postgresql-backend")]
pub use templates::PgTemplateSource;
pub use types::{ProcessedSeo, SeoContext, SeoField, SeoTemplates};
pub use variation::{select_variation, select_variation_with_index, RotationTable};
