//! Append-only link analytics events

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Device class reported by the storefront
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
    #[serde(other)]
    Unknown,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "desktop" => DeviceClass::Desktop,
            "mobile" => DeviceClass::Mobile,
            "tablet" => DeviceClass::Tablet,
            _ => DeviceClass::Unknown,
        }
    }
}

/// One click on an internal link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkClickEvent {
    pub link_type: String,
    pub source_url: String,
    pub destination_url: String,
    pub anchor_text: Option<String>,
    pub position: Option<i32>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub device_type: Option<DeviceClass>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    // A/B attribution, copied from the injected anchor
    pub verb_id: Option<i32>,
    pub noun_id: Option<i32>,
    pub formula: Option<String>,
    pub target_gamme_id: Option<i64>,
    /// Server time is used when absent or too far from server time
    pub timestamp: Option<DateTime<Utc>>,
}

/// Links of one type exposed on one page view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkImpressionEvent {
    pub link_type: String,
    pub page_url: String,
    pub link_count: i32,
    pub session_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Click row as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRecord {
    pub event: LinkClickEvent,
    pub timestamp: DateTime<Utc>,
}

/// Impression row as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpressionRecord {
    pub event: LinkImpressionEvent,
    pub timestamp: DateTime<Utc>,
}

impl LinkClickEvent {
    pub fn new(
        link_type: impl Into<String>,
        source_url: impl Into<String>,
        destination_url: impl Into<String>,
    ) -> Self {
        Self {
            link_type: link_type.into(),
            source_url: source_url.into(),
            destination_url: destination_url.into(),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_device(mut self, device: DeviceClass) -> Self {
        self.device_type = Some(device);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn into_record(self, now: DateTime<Utc>, max_skew: Duration) -> ClickRecord {
        let timestamp = event_time(self.timestamp, now, max_skew);
        ClickRecord {
            event: self,
            timestamp,
        }
    }
}

impl LinkImpressionEvent {
    pub fn new(link_type: impl Into<String>, page_url: impl Into<String>, link_count: i32) -> Self {
        Self {
            link_type: link_type.into(),
            page_url: page_url.into(),
            link_count,
            ..Default::default()
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn into_record(self, now: DateTime<Utc>, max_skew: Duration) -> ImpressionRecord {
        let timestamp = event_time(self.timestamp, now, max_skew);
        ImpressionRecord {
            event: self,
            timestamp,
        }
    }
}

/// Client clocks are trusted only within `max_skew` of server time
fn event_time(reported: Option<DateTime<Utc>>, now: DateTime<Utc>, max_skew: Duration) -> DateTime<Utc> {
    match reported {
        Some(at) if (at - now).abs() <= max_skew => at,
        _ => now,
    }
}
