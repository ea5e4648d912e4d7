//! Bounded depth-first sitemap crawl.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domrel_client::DomrelClient;
use domrel_core::{CrawlLimits, SitemapNode, SitemapStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::parse::{parse_sitemap_index, parse_url_set};
use crate::error::{ReconError, ReconResult};

/// Retrieves sitemap documents
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Body of `location`; non-2xx answers are errors
    async fn fetch(&self, location: &str) -> ReconResult<Vec<u8>>;
}

#[async_trait]
impl Fetch for DomrelClient {
    async fn fetch(&self, location: &str) -> ReconResult<Vec<u8>> {
        Ok(self.get_bytes(location).await?)
    }
}

/// Why a crawl stopped before its frontier was exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlHalt {
    /// The domain holds as many sitemap nodes as allowed
    NodeLimit,
    /// The crawl collected as many URLs as allowed
    UrlLimit,
}

/// A sitemap location that could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlFailure {
    /// Sitemap location
    pub location: String,
    /// What went wrong
    pub reason: String,
}

/// Result of one crawl pass; partial results are valid
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Leaf URLs in discovery order, deduplicated
    pub urls: Vec<String>,
    /// The domain's sitemap nodes after the pass
    pub nodes: Vec<SitemapNode>,
    /// Locations that failed to fetch or parse
    pub failures: Vec<CrawlFailure>,
    /// Set when a global bound stopped the crawl
    pub halted: Option<CrawlHalt>,
    /// Set when the cancellation token fired
    pub cancelled: bool,
}

/// Transient state of one pass
struct CrawlState {
    nodes: Vec<SitemapNode>,
    by_location: HashMap<String, usize>,
    seen: HashSet<String>,
    urls: Vec<String>,
    url_set: HashSet<String>,
    failures: Vec<CrawlFailure>,
    now: DateTime<Utc>,
}

impl CrawlState {
    fn new(known: Vec<SitemapNode>, now: DateTime<Utc>) -> Self {
        let by_location = known
            .iter()
            .enumerate()
            .map(|(i, node)| (node.location.clone(), i))
            .collect();
        let seen = known
            .iter()
            .filter(|node| node.status.is_terminal())
            .map(|node| node.location.clone())
            .collect();

        Self {
            nodes: known,
            by_location,
            seen,
            urls: Vec::new(),
            url_set: HashSet::new(),
            failures: Vec::new(),
            now,
        }
    }

    /// Node for `location`, created as unvisited if new
    fn node_mut(&mut self, location: &str) -> &mut SitemapNode {
        let index = match self.by_location.get(location) {
            Some(&index) => index,
            None => {
                self.nodes.push(SitemapNode::discovered(location, self.now));
                self.by_location
                    .insert(location.to_string(), self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[index]
    }

    fn finish(&mut self, location: &str, status: SitemapStatus) {
        let now = self.now;
        let node = self.node_mut(location);
        node.status = status;
        node.updated_at = now;
    }

    fn fail(&mut self, location: &str, reason: String) {
        warn!(location, reason = %reason, "sitemap failed");
        self.finish(location, SitemapStatus::Failed);
        self.failures.push(CrawlFailure {
            location: location.to_string(),
            reason,
        });
    }

    /// Add page URLs; returns true once the URL bound is reached
    fn add_urls(&mut self, urls: Vec<String>, limit: usize) -> bool {
        for url in urls {
            if self.urls.len() >= limit {
                return true;
            }
            if self.url_set.insert(url.clone()) {
                self.urls.push(url);
            }
        }
        self.urls.len() >= limit
    }
}

/// Depth-first sitemap crawler for one domain
pub struct SitemapCrawler<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    limits: CrawlLimits,
    fetch_timeout: Duration,
    cancel: CancellationToken,
}

impl<'a, F: Fetch + ?Sized> SitemapCrawler<'a, F> {
    /// Per-fetch timeout
    pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

    /// Crawler with default bounds
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            limits: CrawlLimits::default(),
            fetch_timeout: Self::DEFAULT_FETCH_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    /// Set crawl bounds
    #[must_use]
    pub const fn limits(mut self, limits: CrawlLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the per-fetch timeout
    #[must_use]
    pub const fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Stop when `token` is cancelled
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Crawl from `seeds` (robots.txt order) and the domain's `known` nodes.
    ///
    /// Known nodes that already left `Unvisited` are never fetched again;
    /// known unvisited nodes join the frontier after the seeds. The node
    /// bound caps the domain's aggregate node count: it is checked before
    /// each frontier entry is expanded and before any index child becomes a
    /// node. The URL bound is checked as URLs are added.
    pub async fn crawl(
        &self,
        seeds: &[String],
        known: Vec<SitemapNode>,
        now: DateTime<Utc>,
    ) -> CrawlOutcome {
        let mut state = CrawlState::new(known, now);

        let mut frontier: Vec<String> = seeds
            .iter()
            .take(self.limits.robots_sitemaps)
            .cloned()
            .collect();
        frontier.extend(
            state
                .nodes
                .iter()
                .filter(|node| !node.status.is_terminal())
                .map(|node| node.location.clone()),
        );

        let mut halted = None;
        let mut cancelled = false;

        'frontier: for seed in frontier {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if state.nodes.len() >= self.limits.sitemap_nodes {
                debug!(nodes = state.nodes.len(), "sitemap node bound reached");
                halted = Some(CrawlHalt::NodeLimit);
                break;
            }
            if !state.seen.insert(seed.clone()) {
                continue;
            }
            state.node_mut(&seed);

            let mut stack: Vec<(String, Option<String>)> = vec![(seed, None)];
            while let Some((location, parent)) = stack.pop() {
                debug!(location = %location, parent = ?parent, "fetching sitemap");

                let body = match self.fetch(&location).await {
                    Ok(body) => body,
                    Err(ReconError::Cancelled) => {
                        cancelled = true;
                        break 'frontier;
                    }
                    Err(e) => {
                        state.fail(&location, e.to_string());
                        continue;
                    }
                };

                let children = match parse_sitemap_index(&body) {
                    Ok(listed) => self.accept_children(&location, listed),
                    Err(_) => Vec::new(),
                };
                let is_index = !children.is_empty();

                let mut fresh = Vec::new();
                for child in children {
                    if state.seen.contains(&child) {
                        continue;
                    }
                    if !state.by_location.contains_key(&child)
                        && state.nodes.len() >= self.limits.sitemap_nodes
                    {
                        debug!(
                            location = %location,
                            nodes = state.nodes.len(),
                            "sitemap node bound reached, dropping children"
                        );
                        halted = Some(CrawlHalt::NodeLimit);
                        break;
                    }
                    state.seen.insert(child.clone());
                    state.node_mut(&child);
                    fresh.push(child);
                }
                // reversed so the first child is expanded first
                for child in fresh.into_iter().rev() {
                    stack.push((child, Some(location.clone())));
                }

                let urls = parse_url_set(&body);
                let status = match (&urls, is_index) {
                    (_, true) => SitemapStatus::Index,
                    (Ok(_), false) => SitemapStatus::Leaf,
                    (Err(e), false) => {
                        state.fail(&location, e.to_string());
                        continue;
                    }
                };
                state.finish(&location, status);

                if let Ok(urls) = urls {
                    if state.add_urls(urls, self.limits.urls) {
                        debug!(urls = state.urls.len(), "sitemap URL bound reached");
                        halted = Some(CrawlHalt::UrlLimit);
                        break 'frontier;
                    }
                }
            }
        }

        info!(
            urls = state.urls.len(),
            nodes = state.nodes.len(),
            failures = state.failures.len(),
            halted = ?halted,
            cancelled,
            "sitemap crawl finished"
        );

        CrawlOutcome {
            urls: state.urls,
            nodes: state.nodes,
            failures: state.failures,
            halted,
            cancelled,
        }
    }

    /// Filter an index's children: no self reference, `.xml` only, fan-out
    /// capped
    fn accept_children(&self, location: &str, listed: Vec<String>) -> Vec<String> {
        let mut accepted = Vec::new();
        for child in listed {
            if child == location {
                warn!(location, "sitemap index lists itself, skipping");
                continue;
            }
            if !child.contains(".xml") {
                continue;
            }
            if accepted.len() >= self.limits.children_per_index {
                debug!(location, limit = self.limits.children_per_index, "child sitemap bound reached");
                break;
            }
            accepted.push(child);
        }
        accepted
    }

    async fn fetch(&self, location: &str) -> ReconResult<Vec<u8>> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ReconError::Cancelled),
            result = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(location)) => {
                result.map_err(|_| ReconError::Timeout(self.fetch_timeout.as_secs()))?
            }
        }
    }
}
