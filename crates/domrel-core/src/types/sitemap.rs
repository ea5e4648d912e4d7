use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sitemap locations taken from robots.txt
pub const MAX_ROBOTS_SITEMAPS: usize = 11;

/// Child sitemaps accepted from a single index
pub const MAX_CHILD_SITEMAPS: usize = 200;

/// Sitemap nodes a domain may accumulate before crawling stops
pub const MAX_SITEMAP_NODES: usize = 15;

/// Leaf URLs one crawl may accumulate before it stops
pub const MAX_SITEMAP_URLS: usize = 10_000;

/// Contact pages fetched per sitemap probe
pub const MAX_CONTACT_PAGES: usize = 10;

/// Crawl state of a sitemap location.
///
/// A location leaves `Unvisited` once and never returns to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SitemapStatus {
    /// Referenced but not fetched yet
    #[default]
    Unvisited,
    /// Fetched, listed content URLs only
    Leaf,
    /// Fetched, listed child sitemaps
    Index,
    /// Fetch failed or neither document shape parsed
    Failed,
}

impl SitemapStatus {
    /// Whether the location has been fetched (successfully or not)
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Unvisited)
    }
}

/// A sitemap location known for a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapNode {
    /// Sitemap URL
    #[serde(rename = "sitemapLoc")]
    pub location: String,

    /// When the location was first referenced
    pub created_at: DateTime<Utc>,

    /// When the location was last referenced or fetched
    pub updated_at: DateTime<Utc>,

    /// Crawl state
    #[serde(default)]
    pub status: SitemapStatus,
}

impl SitemapNode {
    /// A freshly referenced, not yet fetched location
    #[must_use]
    pub fn discovered(location: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            location: location.into(),
            created_at: now,
            updated_at: now,
            status: SitemapStatus::Unvisited,
        }
    }
}

/// Resource bounds for the sitemap probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlLimits {
    /// Seeds taken from robots.txt
    pub robots_sitemaps: usize,
    /// Children accepted per sitemap index
    pub children_per_index: usize,
    /// Sitemap nodes per domain
    pub sitemap_nodes: usize,
    /// Leaf URLs per crawl
    pub urls: usize,
    /// Contact pages fetched per probe
    pub contact_pages: usize,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            robots_sitemaps: MAX_ROBOTS_SITEMAPS,
            children_per_index: MAX_CHILD_SITEMAPS,
            sitemap_nodes: MAX_SITEMAP_NODES,
            urls: MAX_SITEMAP_URLS,
            contact_pages: MAX_CONTACT_PAGES,
        }
    }
}
