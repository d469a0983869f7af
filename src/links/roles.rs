//! Page roles and the internal-link allow-list

use serde::{Deserialize, Serialize};

/// Role a page plays in the site structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageRole {
    /// Home and marketing landing pages
    Landing,
    /// Editorial/advice articles
    Blog,
    /// Product family page (all vehicles)
    Family,
    /// Vehicle page (all families)
    Vehicle,
    /// Product family for one vehicle
    VehicleFamily,
}

impl PageRole {
    /// Whether a page with this role may link to a page with role `target`
    pub fn may_link_to(self, target: PageRole) -> bool {
        use PageRole::*;
        matches!(
            (self, target),
            (Landing, Family)
                | (Blog, Family)
                | (Blog, VehicleFamily)
                | (Family, Family)
                | (Family, VehicleFamily)
                | (Vehicle, VehicleFamily)
                | (VehicleFamily, Family)
                | (VehicleFamily, VehicleFamily)
        )
    }

    /// Editorial surfaces get the tighter link ceiling
    pub fn is_editorial(self) -> bool {
        matches!(self, PageRole::Blog)
    }
}

/// The page the injected links will live on
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourcePage {
    pub role: Option<PageRole>,
    /// Relative URL of the page, used to drop self-links
    pub url: Option<String>,
}

impl SourcePage {
    pub fn new(role: PageRole, url: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            url: Some(url.into()),
        }
    }

    /// Unknown source: no role filtering
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn allows(&self, target: PageRole) -> bool {
        self.role.map_or(true, |role| role.may_link_to(target))
    }

    pub fn is_same_url(&self, url: &str) -> bool {
        self.url.as_deref().is_some_and(|own| own == url)
    }
}
