//! Domain enrichment by running every configured probe in order.

use std::sync::Arc;

use chrono::Utc;
use domrel_client::DomrelClient;
use domrel_core::{Canonicalize, Domain, EnrichmentConfig, Probe};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cert_sans::{probe_cert_sans, CertSource, TlsCertSource};
use crate::dns::{probe_dns, DnsSource, HickoryDns};
use crate::error::{ReconError, ReconResult};
use crate::sitemap::SitemapProbe;
use crate::web_redirect::probe_web_redirect;
use crate::whois::{probe_reverse_whois, probe_whois, WhoisSource};

/// What one enrichment pass did for a domain
#[derive(Debug, Default)]
pub struct EnrichmentReport {
    /// Probes that were attempted
    pub ran: Vec<Probe>,
    /// Probes left out: disabled, still fresh, or without a source
    pub skipped: Vec<Probe>,
    /// Failures of attempted probes
    pub errors: Vec<(Probe, ReconError)>,
}

impl EnrichmentReport {
    /// Whether every attempted probe succeeded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Builder for domain enrichment with pluggable data sources
pub struct DomainEnricher {
    client: DomrelClient,
    canonicalizer: Arc<dyn Canonicalize>,
    dns: Option<Arc<dyn DnsSource>>,
    certs: Option<Arc<dyn CertSource>>,
    whois: Option<Arc<dyn WhoisSource>>,
    config: EnrichmentConfig,
    cancel: CancellationToken,
}

impl DomainEnricher {
    /// Enricher with only the HTTP-based probes wired up.
    ///
    /// WHOIS goes through `client` unless [`Self::with_whois`] replaces it.
    #[must_use]
    pub fn new(client: DomrelClient, canonicalizer: Arc<dyn Canonicalize>) -> Self {
        let whois: Arc<dyn WhoisSource> = Arc::new(client.clone());
        Self {
            client,
            canonicalizer,
            dns: None,
            certs: None,
            whois: Some(whois),
            config: EnrichmentConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Add Google DNS and a TLS certificate reader using the client's
    /// timeouts
    pub fn with_default_sources(self) -> ReconResult<Self> {
        let certs = TlsCertSource::from_config(self.client.config())?;
        Ok(self
            .with_dns(Arc::new(HickoryDns::google()))
            .with_certs(Arc::new(certs)))
    }

    /// Add a DNS source
    #[must_use]
    pub fn with_dns(mut self, source: Arc<dyn DnsSource>) -> Self {
        self.dns = Some(source);
        self
    }

    /// Add a certificate source
    #[must_use]
    pub fn with_certs(mut self, source: Arc<dyn CertSource>) -> Self {
        self.certs = Some(source);
        self
    }

    /// Replace the WHOIS source
    #[must_use]
    pub fn with_whois(mut self, source: Arc<dyn WhoisSource>) -> Self {
        self.whois = Some(source);
        self
    }

    /// Set probe switches, freshness and crawl bounds
    #[must_use]
    pub fn with_config(mut self, config: EnrichmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop starting probes, and stop crawling, once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run every enabled, stale probe against `domain`.
    ///
    /// A probe runs when its last run is missing or not newer than the
    /// freshness cut-off. Its last-run time is recorded after it finishes,
    /// even with an error, unless it stopped on an unmet precondition.
    pub async fn enrich(&self, domain: &mut Domain) -> EnrichmentReport {
        let cutoff = self.config.cutoff(Utc::now());
        let mut report = EnrichmentReport::default();

        for probe in Probe::ALL {
            if self.cancel.is_cancelled()
                || !self.config.is_enabled(probe)
                || !domain.needs_run(probe, cutoff)
            {
                report.skipped.push(probe);
                continue;
            }

            let Some(result) = self.run(probe, domain).await else {
                debug!(domain = %domain, probe = %probe, "no source configured");
                report.skipped.push(probe);
                continue;
            };

            report.ran.push(probe);
            match result {
                Ok(()) => domain.last_ran.mark(probe, Utc::now()),
                Err(e) if e.is_precondition() => {
                    debug!(domain = %domain, probe = %probe, reason = %e, "probe not applicable");
                    report.errors.push((probe, e));
                }
                Err(e) => {
                    warn!(domain = %domain, probe = %probe, error = %e, "probe failed");
                    domain.last_ran.mark(probe, Utc::now());
                    report.errors.push((probe, e));
                }
            }
        }

        if !report.ran.is_empty() {
            domain.updated_at = Utc::now();
        }

        info!(
            domain = %domain,
            ran = report.ran.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            "enrichment finished"
        );
        report
    }

    /// `None` when the probe's source is not configured
    async fn run(&self, probe: Probe, domain: &mut Domain) -> Option<ReconResult<()>> {
        let canonicalizer = self.canonicalizer.as_ref();
        let result = match probe {
            Probe::Dns => probe_dns(domain, self.dns.as_deref()?).await,
            Probe::WebRedirect => probe_web_redirect(domain, &self.client, canonicalizer).await,
            Probe::CertSans => {
                probe_cert_sans(domain, self.certs.as_deref()?, canonicalizer).await
            }
            Probe::Sitemap => SitemapProbe::new(&self.client, canonicalizer)
                .limits(self.config.crawl)
                .cancellation(self.cancel.clone())
                .run(domain)
                .await
                .map(drop),
            Probe::Whois => probe_whois(domain, self.whois.as_deref()?).await,
            Probe::ReverseWhois => probe_reverse_whois(domain, self.whois.as_deref()?).await,
        };
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::tests::suffixes;
    use crate::cert_sans::CertificateNames;
    use crate::dns::DnsAnswer;
    use async_trait::async_trait;
    use chrono::Duration;
    use domrel_core::{DnsRecordType, WhoisData};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDns {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DnsSource for CountingDns {
        async fn lookup(&self, _name: &str, record_type: DnsRecordType) -> ReconResult<Vec<DnsAnswer>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match record_type {
                DnsRecordType::A => Ok(vec![DnsAnswer::Address("93.184.216.34".parse().unwrap())]),
                _ => Ok(Vec::new()),
            }
        }
    }

    struct Certs;

    #[async_trait]
    impl CertSource for Certs {
        async fn peer_certificate(&self, _host: &str) -> ReconResult<CertificateNames> {
            Ok(CertificateNames {
                dns_names: vec![String::from("example.com"), String::from("*.example.net")],
                organizations: vec![String::from("Example Inc.")],
            })
        }
    }

    struct Undisclosed;

    #[async_trait]
    impl WhoisSource for Undisclosed {
        async fn lookup(&self, domain: &str) -> ReconResult<WhoisData> {
            Ok(WhoisData {
                domain_name: domain.to_string(),
                ..WhoisData::default()
            })
        }

        async fn reverse(&self, _organization: &str) -> ReconResult<Vec<String>> {
            Ok(vec![String::from("example.org")])
        }
    }

    fn offline_config() -> EnrichmentConfig {
        EnrichmentConfig {
            web_redirect: false,
            sitemap: false,
            ..EnrichmentConfig::default()
        }
    }

    fn enricher(dns: Arc<CountingDns>) -> DomainEnricher {
        DomainEnricher::new(DomrelClient::new().unwrap(), Arc::new(suffixes()))
            .with_dns(dns)
            .with_certs(Arc::new(Certs))
            .with_whois(Arc::new(Undisclosed))
    }

    #[tokio::test]
    async fn runs_enabled_probes_and_marks_them() {
        let dns = Arc::new(CountingDns::default());
        let enricher = enricher(dns.clone()).with_config(offline_config());
        let mut domain = Domain::new("example.com", &suffixes()).unwrap();

        let report = enricher.enrich(&mut domain).await;

        assert_eq!(report.ran, [Probe::Dns, Probe::CertSans]);
        assert!(report.is_clean());
        assert_eq!(dns.calls.load(Ordering::SeqCst), 4);
        assert_eq!(domain.a_records[0].key, "93.184.216.34");
        assert_eq!(domain.cert_sans[0].key, "example.net");
        assert!(domain.last_ran.dns.is_some());
        assert!(domain.last_ran.cert_sans.is_some());
        assert!(domain.last_ran.whois.is_none());
    }

    #[tokio::test]
    async fn fresh_probes_are_skipped() {
        let dns = Arc::new(CountingDns::default());
        let config = EnrichmentConfig {
            min_freshness: Some(Utc::now() - Duration::hours(1)),
            ..offline_config()
        };
        let enricher = enricher(dns.clone()).with_config(config);
        let mut domain = Domain::new("example.com", &suffixes()).unwrap();

        enricher.enrich(&mut domain).await;
        let report = enricher.enrich(&mut domain).await;

        assert!(report.ran.is_empty());
        assert_eq!(dns.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn precondition_failures_are_not_marked() {
        let config = EnrichmentConfig {
            dns: false,
            cert_sans: false,
            whois: true,
            reverse_whois: true,
            ..offline_config()
        };
        let enricher = enricher(Arc::new(CountingDns::default())).with_config(config);
        let mut domain = Domain::new("example.com", &suffixes()).unwrap();

        let report = enricher.enrich(&mut domain).await;

        assert_eq!(report.ran, [Probe::Whois, Probe::ReverseWhois]);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], (Probe::ReverseWhois, ReconError::NoRegistrant)));
        assert!(domain.last_ran.whois.is_some());
        assert!(domain.last_ran.reverse_whois.is_none());
        assert!(domain.reverse_whois_domains.is_empty());
    }

    #[tokio::test]
    async fn missing_sources_are_skipped() {
        let enricher = DomainEnricher::new(DomrelClient::new().unwrap(), Arc::new(suffixes()))
            .with_config(offline_config());
        let mut domain = Domain::new("example.com", &suffixes()).unwrap();

        let report = enricher.enrich(&mut domain).await;

        assert!(report.ran.is_empty());
        assert!(report.skipped.contains(&Probe::Dns));
        assert!(report.skipped.contains(&Probe::CertSans));
    }

    #[tokio::test]
    async fn cancelled_enricher_starts_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let dns = Arc::new(CountingDns::default());
        let enricher = enricher(dns.clone())
            .with_config(offline_config())
            .with_cancellation(token);
        let mut domain = Domain::new("example.com", &suffixes()).unwrap();

        let report = enricher.enrich(&mut domain).await;

        assert!(report.ran.is_empty());
        assert_eq!(dns.calls.load(Ordering::SeqCst), 0);
    }
}
