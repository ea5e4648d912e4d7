//! robots.txt retrieval and rule matching.

use domrel_client::DomrelClient;
use robotstxt::DefaultMatcher;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ReconError, ReconResult};

/// Agent name used when checking contact pages
pub const ANY_AGENT: &str = "*";

/// Access rules for URLs on one host
pub trait RuleSet: Send + Sync {
    /// Whether `agent` may fetch `url`
    fn is_allowed(&self, url: &str, agent: &str) -> bool;
}

/// Rules derived from a robots.txt response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsRules {
    /// robots.txt missing (4xx): everything allowed
    AllowAll,
    /// Server error (5xx): nothing allowed
    DisallowAll,
    /// Parsed robots.txt body
    Parsed {
        /// Raw body, matched on demand
        body: String,
        /// `Sitemap:` locations in file order
        sitemaps: Vec<String>,
    },
}

impl RobotsRules {
    /// Parse a robots.txt body
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let sitemaps = body
            .lines()
            .filter_map(|line| {
                let line = line.split('#').next().unwrap_or_default().trim();
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case("sitemap")
                    .then(|| value.trim().to_string())
            })
            .filter(|location| !location.is_empty())
            .collect();

        Self::Parsed {
            body: body.to_string(),
            sitemaps,
        }
    }

    /// Advertised sitemap locations
    #[must_use]
    pub fn sitemaps(&self) -> &[String] {
        match self {
            Self::Parsed { sitemaps, .. } => sitemaps,
            Self::AllowAll | Self::DisallowAll => &[],
        }
    }
}

impl RuleSet for RobotsRules {
    fn is_allowed(&self, url: &str, agent: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DisallowAll => false,
            Self::Parsed { body, .. } => {
                DefaultMatcher::default().one_agent_allowed_by_robots(body, agent, url)
            }
        }
    }
}

/// Scheme and host of `url`, defaulting to `http` for anything that is not
/// an HTTP scheme
pub fn site_root(url: &Url) -> ReconResult<Url> {
    let host = url
        .host_str()
        .ok_or_else(|| ReconError::Robots(format!("{url} has no host")))?;
    let scheme = if url.scheme().starts_with("http") {
        url.scheme()
    } else {
        "http"
    };
    let root = match url.port() {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    };
    Url::parse(&root).map_err(|e| ReconError::Robots(e.to_string()))
}

/// Fetch `<root>/robots.txt`.
///
/// A 4xx answer means no restrictions, a 5xx answer means the whole site is
/// off limits. Transport failures are errors.
pub async fn fetch_robots(client: &DomrelClient, root: &Url) -> ReconResult<RobotsRules> {
    let url = root
        .join("/robots.txt")
        .map_err(|e| ReconError::Robots(e.to_string()))?;

    let page = client
        .get_page(url.as_str())
        .await
        .map_err(|e| ReconError::Robots(e.to_string()))?;

    let rules = match page.status {
        200..=299 => RobotsRules::parse(&page.body),
        400..=499 => RobotsRules::AllowAll,
        500..=599 => {
            warn!(url = %url, status = page.status, "robots.txt server error, treating site as disallowed");
            RobotsRules::DisallowAll
        }
        status => {
            return Err(ReconError::Robots(format!(
                "unexpected status {status} from {url}"
            )))
        }
    };

    debug!(url = %url, sitemaps = rules.sitemaps().len(), "robots.txt loaded");
    Ok(rules)
}
