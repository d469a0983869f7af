//! Link tracking and aggregation
//!
//! Rendered pages report clicks and impressions for injected links. Metrics
//! are computed on read from raw events; a nightly job summarizes the previous
//! day and a retention job prunes raw rows once they have been aggregated.

pub mod events;
pub mod metrics;
#[cfg(feature = "postgresql-backend")]
pub mod postgres;
pub mod service;
pub mod store;

pub use events::{DeviceClass, LinkClickEvent, LinkImpressionEvent};
pub use metrics::{ClickStats, LinkMetrics, LinkPerformanceReport};
#[cfg(feature = "postgresql-backend")]
pub use postgres::PgEventStore;
pub use service::{AggregationReport, CleanupReport, LinkTrackingService};
pub use store::{EventStore, MemoryEventStore, SharedEventStore};
