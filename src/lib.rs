//! # seo-link-engine
//!
//! SEO content generation and internal linking for an auto-parts catalog.
//!
//! - [`seo`] expands per-family templates into page copy for a vehicle
//! - [`links`] rewrites link markers into role-checked, budgeted anchors
//! - [`tracking`] records link clicks/impressions and runs the nightly jobs
//!
//! Every component takes its cache and storage collaborators at construction;
//! [`engine`] wires them from an [`EngineConfig`].

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod http_server;
pub mod links;
pub mod logging;
pub mod seo;
pub mod tracking;

pub use config::{BudgetMode, EngineConfig};
pub use error::{Error, Result};
pub use http_server::AppState;
pub use links::{LinkInjector, SeoRenderer};
pub use seo::SeoProcessor;
pub use tracking::LinkTrackingService;
