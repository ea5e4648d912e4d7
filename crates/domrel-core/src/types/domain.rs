use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RegistrantMatch, RelationshipRecord, SitemapNode, SoaRecord, WhoisData};
use crate::error::Result;

/// A name split along its public suffix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalName {
    /// Registrable domain, `hostname.suffix`, lowercase
    pub domain: String,
    /// Label directly left of the suffix
    pub hostname: String,
    /// Everything left of the hostname label, empty if none
    pub subdomain: String,
    /// Public suffix
    pub suffix: String,
}

/// Public-suffix canonicalisation of raw host names.
///
/// Every relationship key that names a domain goes through this before it
/// is merged. Names without a public suffix match fail with
/// [`crate::DomrelError::NotPublic`].
pub trait Canonicalize: Send + Sync {
    /// Split `raw` into its registrable domain and labels
    fn canonicalize(&self, raw: &str) -> Result<CanonicalName>;
}

/// Probe families run by the enrichment orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    /// A/AAAA/MX/SOA lookups
    Dns,
    /// HTTP redirect chain
    WebRedirect,
    /// TLS certificate SANs
    CertSans,
    /// robots.txt, sitemaps and contact pages
    Sitemap,
    /// WHOIS record
    Whois,
    /// Domains sharing the WHOIS registrant
    ReverseWhois,
}

impl Probe {
    /// Every probe, in the order the orchestrator runs them. Sitemap needs
    /// the web landing and reverse WHOIS needs the WHOIS record.
    pub const ALL: [Self; 6] = [
        Self::Dns,
        Self::WebRedirect,
        Self::CertSans,
        Self::Sitemap,
        Self::Whois,
        Self::ReverseWhois,
    ];
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Dns => "dns",
            Self::WebRedirect => "web_redirect",
            Self::CertSans => "cert_sans",
            Self::Sitemap => "sitemap",
            Self::Whois => "whois",
            Self::ReverseWhois => "reverse_whois",
        };
        f.write_str(label)
    }
}

/// Last run of each probe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeTimestamps {
    /// DNS probe
    pub dns: Option<DateTime<Utc>>,
    /// Web redirect probe
    pub web_redirect: Option<DateTime<Utc>>,
    /// Certificate SAN probe
    pub cert_sans: Option<DateTime<Utc>>,
    /// Sitemap probe
    pub sitemap: Option<DateTime<Utc>>,
    /// WHOIS probe
    pub whois: Option<DateTime<Utc>>,
    /// Reverse WHOIS probe
    pub reverse_whois: Option<DateTime<Utc>>,
}

impl ProbeTimestamps {
    /// Last run of `probe`
    #[must_use]
    pub const fn get(&self, probe: Probe) -> Option<DateTime<Utc>> {
        match probe {
            Probe::Dns => self.dns,
            Probe::WebRedirect => self.web_redirect,
            Probe::CertSans => self.cert_sans,
            Probe::Sitemap => self.sitemap,
            Probe::Whois => self.whois,
            Probe::ReverseWhois => self.reverse_whois,
        }
    }

    /// Record a run of `probe` at `at`
    pub fn mark(&mut self, probe: Probe, at: DateTime<Utc>) {
        let slot = match probe {
            Probe::Dns => &mut self.dns,
            Probe::WebRedirect => &mut self.web_redirect,
            Probe::CertSans => &mut self.cert_sans,
            Probe::Sitemap => &mut self.sitemap,
            Probe::Whois => &mut self.whois,
            Probe::ReverseWhois => &mut self.reverse_whois,
        };
        *slot = Some(at);
    }
}

/// Related domain names grouped by discovery strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedDomainsByStrategy {
    /// Redirect chain hostnames
    pub web_redirect_domains: Vec<String>,
    /// Certificate SANs
    #[serde(rename = "certSANs")]
    pub cert_sans: Vec<String>,
    /// Sitemap URL hostnames
    pub sitemap_web_domains: Vec<String>,
    /// Contact page email domains
    pub sitemap_contact_domains: Vec<String>,
    /// Reverse WHOIS matches
    pub reverse_whois_domains: Vec<String>,
}

/// A registrable domain and everything discovered about it.
///
/// Identity is the canonical name: two `Domain` values are equal when their
/// names are equal, whatever their record sets hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    #[serde(rename = "domainName")]
    name: String,

    /// Label directly left of the suffix
    pub hostname: String,

    /// Subdomain labels of the name the domain was created from
    pub subdomain: String,

    /// Public suffix
    pub suffix: String,

    /// First time the domain was seen
    pub created_at: DateTime<Utc>,

    /// Last time the domain was touched
    pub updated_at: DateTime<Utc>,

    /// Whether the last redirect probe reached a web page
    #[serde(default)]
    pub successful_web_landing: bool,

    /// Final URL of the last redirect chain
    #[serde(default, rename = "webRedirectURLFinal")]
    pub web_redirect_url_final: Option<String>,

    /// Last run per probe
    #[serde(default)]
    pub last_ran: ProbeTimestamps,

    /// A answers
    #[serde(default)]
    pub a_records: Vec<RelationshipRecord>,

    /// AAAA answers
    #[serde(default)]
    pub aaaa_records: Vec<RelationshipRecord>,

    /// MX targets
    #[serde(default)]
    pub mx_records: Vec<RelationshipRecord>,

    /// SOA snapshot from the last DNS probe
    #[serde(default)]
    pub soa_records: Vec<SoaRecord>,

    /// Sitemap locations known for the domain
    #[serde(default)]
    pub sitemaps: Vec<SitemapNode>,

    /// Domains seen in the redirect chain
    #[serde(default)]
    pub web_redirect_domains: Vec<RelationshipRecord>,

    /// Domains named in the certificate SANs
    #[serde(default, rename = "certSANs")]
    pub cert_sans: Vec<RelationshipRecord>,

    /// Domains hosting URLs listed in the sitemaps
    #[serde(default)]
    pub sitemap_web_domains: Vec<RelationshipRecord>,

    /// Domains of emails found on contact pages
    #[serde(default)]
    pub sitemap_contact_domains: Vec<RelationshipRecord>,

    /// Domains registered by the same registrant
    #[serde(default)]
    pub reverse_whois_domains: Vec<RelationshipRecord<RegistrantMatch>>,

    /// Subject organisations of the served certificate
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cert_org_names: Vec<String>,

    /// Latest WHOIS record
    #[serde(default, rename = "whoisData")]
    pub whois: Option<WhoisData>,
}

impl Domain {
    /// Create a domain from a raw name, canonicalising it first
    pub fn new(raw: &str, canonicalizer: &dyn Canonicalize) -> Result<Self> {
        let canonical = canonicalizer.canonicalize(raw.trim())?;
        Ok(Self::from_canonical(canonical, Utc::now()))
    }

    /// Create a domain from an already canonicalised name
    #[must_use]
    pub fn from_canonical(canonical: CanonicalName, now: DateTime<Utc>) -> Self {
        Self {
            name: canonical.domain,
            hostname: canonical.hostname,
            subdomain: canonical.subdomain,
            suffix: canonical.suffix,
            created_at: now,
            updated_at: now,
            successful_web_landing: false,
            web_redirect_url_final: None,
            last_ran: ProbeTimestamps::default(),
            a_records: Vec::new(),
            aaaa_records: Vec::new(),
            mx_records: Vec::new(),
            soa_records: Vec::new(),
            sitemaps: Vec::new(),
            web_redirect_domains: Vec::new(),
            cert_sans: Vec::new(),
            sitemap_web_domains: Vec::new(),
            sitemap_contact_domains: Vec::new(),
            reverse_whois_domains: Vec::new(),
            cert_org_names: Vec::new(),
            whois: None,
        }
    }

    /// Canonical registrable name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Related domain names per strategy, sorted
    #[must_use]
    pub fn matched_domains(&self) -> MatchedDomainsByStrategy {
        fn keys<P>(records: &[RelationshipRecord<P>]) -> Vec<String> {
            let mut keys: Vec<String> = records.iter().map(|r| r.key.clone()).collect();
            keys.sort();
            keys
        }

        MatchedDomainsByStrategy {
            web_redirect_domains: keys(&self.web_redirect_domains),
            cert_sans: keys(&self.cert_sans),
            sitemap_web_domains: keys(&self.sitemap_web_domains),
            sitemap_contact_domains: keys(&self.sitemap_contact_domains),
            reverse_whois_domains: keys(&self.reverse_whois_domains),
        }
    }

    /// Whether `probe` should run again given the freshness cut-off
    #[must_use]
    pub fn needs_run(&self, probe: Probe, min_freshness: DateTime<Utc>) -> bool {
        self.last_ran
            .get(probe)
            .map_or(true, |last| last <= min_freshness)
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Domain {}

impl Hash for Domain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
