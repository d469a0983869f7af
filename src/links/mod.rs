//! Internal linking
//!
//! Link markers left in processed content are resolved against the catalog,
//! filtered by page role, checked against the per-surface link budget and
//! rewritten into anchors.

pub mod catalog;
pub mod injector;
pub mod renderer;
pub mod roles;

pub use catalog::{FamilyTarget, LinkCatalog, MemoryLinkCatalog};
#[cfg(feature = "postgresql-backend")]
pub use catalog::PgLinkCatalog;
pub use injector::{LinkFormula, LinkInjectionResult, LinkInjector};
pub use renderer::{RenderedSeo, SeoRenderer};
pub use roles::{PageRole, SourcePage};
