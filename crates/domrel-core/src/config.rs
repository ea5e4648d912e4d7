//! Enrichment run configuration.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomrelError, Result};
use crate::types::{CrawlLimits, Probe};

/// Which probes an enrichment run may execute, and how fresh their
/// previous results must be to be skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Run the DNS probe
    #[serde(default = "enabled")]
    pub dns: bool,

    /// Run the web redirect probe
    #[serde(default = "enabled")]
    pub web_redirect: bool,

    /// Run the certificate SAN probe
    #[serde(default = "enabled")]
    pub cert_sans: bool,

    /// Run the sitemap probe
    #[serde(default = "enabled")]
    pub sitemap: bool,

    /// Run the WHOIS probe
    #[serde(default)]
    pub whois: bool,

    /// Run the reverse WHOIS probe (needs `whois`)
    #[serde(default)]
    pub reverse_whois: bool,

    /// Probes whose last run is at or before this instant run again.
    /// `None` re-runs every enabled probe.
    #[serde(default)]
    pub min_freshness: Option<DateTime<Utc>>,

    /// Sitemap crawl bounds
    #[serde(default)]
    pub crawl: CrawlLimits,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            dns: true,
            web_redirect: true,
            cert_sans: true,
            sitemap: true,
            whois: false,
            reverse_whois: false,
            min_freshness: None,
            crawl: CrawlLimits::default(),
        }
    }
}

impl EnrichmentConfig {
    /// Load configuration from a TOML file, or defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| DomrelError::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Whether `probe` is switched on
    #[must_use]
    pub const fn is_enabled(&self, probe: Probe) -> bool {
        match probe {
            Probe::Dns => self.dns,
            Probe::WebRedirect => self.web_redirect,
            Probe::CertSans => self.cert_sans,
            Probe::Sitemap => self.sitemap,
            Probe::Whois => self.whois,
            Probe::ReverseWhois => self.whois && self.reverse_whois,
        }
    }

    /// Freshness cut-off for a run starting at `now`
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.min_freshness.unwrap_or(now)
    }
}

const fn enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EnrichmentConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EnrichmentConfig::default());
        assert!(config.is_enabled(Probe::Sitemap));
        assert!(!config.is_enabled(Probe::Whois));
    }

    #[test]
    fn loads_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            dns = false
            whois = true
            reverse_whois = true
            min_freshness = "2024-01-01T00:00:00Z"

            [crawl]
            sitemap_nodes = 5
            "#
        )
        .unwrap();

        let config = EnrichmentConfig::load(file.path()).unwrap();
        assert!(!config.is_enabled(Probe::Dns));
        assert!(config.is_enabled(Probe::CertSans));
        assert!(config.is_enabled(Probe::ReverseWhois));
        assert_eq!(config.crawl.sitemap_nodes, 5);
        assert_eq!(config.crawl.urls, 10_000);
        assert!(config.min_freshness.is_some());
    }

    #[test]
    fn reverse_whois_requires_whois() {
        let config = EnrichmentConfig {
            whois: false,
            reverse_whois: true,
            ..EnrichmentConfig::default()
        };
        assert!(!config.is_enabled(Probe::ReverseWhois));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dns = \"sometimes\"").unwrap();
        let err = EnrichmentConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, DomrelError::Config(_)));
    }
}
