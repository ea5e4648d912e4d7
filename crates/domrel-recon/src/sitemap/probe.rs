use chrono::Utc;
use domrel_client::DomrelClient;
use domrel_core::merge::merge_keys;
use domrel_core::{Canonicalize, CrawlLimits, DiscoveryMethod, Domain};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::crawl::{CrawlFailure, CrawlHalt, SitemapCrawler};
use crate::contact::{collect_contact_domains, select_contact_pages};
use crate::error::{ReconError, ReconResult};
use crate::robots::{fetch_robots, site_root};

/// What one sitemap probe run did
#[derive(Debug, Clone, Default)]
pub struct SitemapReport {
    /// Leaf URLs collected by the crawl
    pub urls: usize,
    /// Contact pages fetched
    pub contact_pages: Vec<String>,
    /// Sitemaps that failed
    pub failures: Vec<CrawlFailure>,
    /// Bound that stopped the crawl, if any
    pub halted: Option<CrawlHalt>,
    /// Whether the crawl was cancelled
    pub cancelled: bool,
}

/// robots.txt → sitemap crawl → web domains and contact domains
pub struct SitemapProbe<'a> {
    client: &'a DomrelClient,
    canonicalizer: &'a dyn Canonicalize,
    limits: CrawlLimits,
    cancel: CancellationToken,
}

impl<'a> SitemapProbe<'a> {
    /// Probe with default crawl bounds
    pub fn new(client: &'a DomrelClient, canonicalizer: &'a dyn Canonicalize) -> Self {
        Self {
            client,
            canonicalizer,
            limits: CrawlLimits::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set crawl bounds
    #[must_use]
    pub const fn limits(mut self, limits: CrawlLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Stop crawling when `token` is cancelled
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the probe against `domain`.
    ///
    /// Needs a successful web landing. robots.txt is read from the landing
    /// URL's site root; if it cannot be fetched nothing else happens. Web
    /// domains are merged before contact pages are looked at, so a
    /// [`ReconError::NoContactPages`] result still leaves them updated.
    pub async fn run(&self, domain: &mut Domain) -> ReconResult<SitemapReport> {
        if !domain.successful_web_landing {
            return Err(ReconError::NoWebLanding);
        }

        let landing = domain
            .web_redirect_url_final
            .clone()
            .unwrap_or_else(|| format!("http://{}", domain.name()));
        let landing = Url::parse(&landing)
            .map_err(|e| ReconError::Robots(format!("bad landing URL {landing}: {e}")))?;
        let rules = fetch_robots(self.client, &site_root(&landing)?).await?;

        let timeout = self.client.config().request_timeout();
        let known = std::mem::take(&mut domain.sitemaps);
        let outcome = SitemapCrawler::new(self.client)
            .limits(self.limits)
            .fetch_timeout(timeout)
            .cancellation(self.cancel.clone())
            .crawl(rules.sitemaps(), known, Utc::now())
            .await;
        domain.sitemaps = outcome.nodes;

        let web = web_domains(&outcome.urls, self.canonicalizer);
        let prior = std::mem::take(&mut domain.sitemap_web_domains);
        domain.sitemap_web_domains =
            merge_keys(domain.name(), DiscoveryMethod::SitemapWeb, prior, web, Utc::now());

        let mut report = SitemapReport {
            urls: outcome.urls.len(),
            contact_pages: Vec::new(),
            failures: outcome.failures,
            halted: outcome.halted,
            cancelled: outcome.cancelled,
        };

        debug!(
            domain = %domain,
            urls = report.urls,
            failures = report.failures.len(),
            halted = ?report.halted,
            cancelled = report.cancelled,
            "sitemap crawl summary"
        );

        report.contact_pages =
            select_contact_pages(&outcome.urls, &rules, self.limits.contact_pages);
        if report.contact_pages.is_empty() {
            return Err(ReconError::NoContactPages);
        }

        let contact = collect_contact_domains(
            self.client,
            &report.contact_pages,
            self.canonicalizer,
            timeout,
            &self.cancel,
        )
        .await;
        let prior = std::mem::take(&mut domain.sitemap_contact_domains);
        domain.sitemap_contact_domains = merge_keys(
            domain.name(),
            DiscoveryMethod::SitemapContact,
            prior,
            contact,
            Utc::now(),
        );

        info!(
            domain = %domain,
            urls = report.urls,
            web_domains = domain.sitemap_web_domains.len(),
            contact_domains = domain.sitemap_contact_domains.len(),
            "sitemap probe finished"
        );
        Ok(report)
    }
}

/// Canonical domains of the hosts serving `urls`
fn web_domains(urls: &[String], canonicalizer: &dyn Canonicalize) -> Vec<String> {
    urls.iter()
        .filter_map(|raw| {
            let url = Url::parse(raw.trim())
                .map_err(|e| debug!(url = %raw, error = %e, "unparseable sitemap URL"))
                .ok()?;
            let host = url.host_str()?;
            canonicalizer
                .canonicalize(host)
                .map_err(|e| debug!(host, error = %e, "dropping sitemap host"))
                .ok()
        })
        .map(|name| name.domain)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::tests::suffixes;

    #[test]
    fn web_domains_skip_unparseable_and_private_hosts() {
        let urls: Vec<String> = [
            " https://www.example.com/a ",
            "https://cdn.example.net/b",
            "http://127.0.0.1:8080/c",
            "not a url",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        assert_eq!(web_domains(&urls, &suffixes()), ["example.com", "example.net"]);
    }

    #[tokio::test]
    async fn requires_web_landing() {
        let client = DomrelClient::new().unwrap();
        let list = suffixes();
        let mut domain = Domain::new("example.com", &list).unwrap();

        let err = SitemapProbe::new(&client, &list)
            .run(&mut domain)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconError::NoWebLanding));
    }
}
