//! WHOIS and reverse WHOIS probes.

use async_trait::async_trait;
use chrono::Utc;
use domrel_client::DomrelClient;
use domrel_core::merge::merge;
use domrel_core::{DiscoveryMethod, Domain, RegistrantMatch, WhoisData};
use tracing::{debug, info};

use crate::error::{ReconError, ReconResult};

/// WHOIS record and reverse WHOIS lookups
#[async_trait]
pub trait WhoisSource: Send + Sync {
    /// WHOIS record of `domain`
    async fn lookup(&self, domain: &str) -> ReconResult<WhoisData>;

    /// Domains registered by `organization`
    async fn reverse(&self, organization: &str) -> ReconResult<Vec<String>>;
}

#[async_trait]
impl WhoisSource for DomrelClient {
    async fn lookup(&self, domain: &str) -> ReconResult<WhoisData> {
        self.whois()
            .lookup(domain)
            .await
            .map_err(|e| ReconError::Whois(e.to_string()))
    }

    async fn reverse(&self, organization: &str) -> ReconResult<Vec<String>> {
        self.whois()
            .reverse(organization)
            .await
            .map_err(|e| ReconError::Whois(e.to_string()))
    }
}

/// Fetch and store the WHOIS record of `domain`
pub async fn probe_whois(domain: &mut Domain, source: &dyn WhoisSource) -> ReconResult<()> {
    let mut record = source.lookup(domain.name()).await?;
    record.last_updated = Some(Utc::now());

    debug!(
        domain = %domain,
        registrar = %record.registrar_name,
        organization = record.registrant_organization().unwrap_or_default(),
        "WHOIS record stored"
    );
    domain.whois = Some(record);
    Ok(())
}

/// Search for other domains held by the stored registrant organisation.
///
/// Needs a WHOIS record whose registrant organisation is disclosed.
pub async fn probe_reverse_whois(
    domain: &mut Domain,
    source: &dyn WhoisSource,
) -> ReconResult<()> {
    let organization = domain
        .whois
        .as_ref()
        .and_then(WhoisData::registrant_organization)
        .map(ToString::to_string)
        .ok_or(ReconError::NoRegistrant)?;

    let matches = source.reverse(&organization).await?;
    let fresh = matches
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| {
            (
                name.to_string(),
                RegistrantMatch {
                    organization: organization.clone(),
                },
            )
        });

    let prior = std::mem::take(&mut domain.reverse_whois_domains);
    domain.reverse_whois_domains = merge(
        domain.name(),
        DiscoveryMethod::ReverseWhois,
        prior,
        fresh,
        Utc::now(),
    );

    info!(
        domain = %domain,
        organization = %organization,
        matches = matches.len(),
        "reverse WHOIS probe finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::tests::suffixes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StaticWhois {
        organization: String,
        matches: Vec<String>,
        searched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WhoisSource for StaticWhois {
        async fn lookup(&self, domain: &str) -> ReconResult<WhoisData> {
            let mut record = WhoisData {
                domain_name: domain.to_string(),
                registrar_name: String::from("Example Registrar, Inc."),
                ..WhoisData::default()
            };
            record.registrant.organization = self.organization.clone();
            Ok(record)
        }

        async fn reverse(&self, organization: &str) -> ReconResult<Vec<String>> {
            self.searched.lock().unwrap().push(organization.to_string());
            Ok(self.matches.clone())
        }
    }

    fn domain() -> Domain {
        Domain::new("example.com", &suffixes()).unwrap()
    }

    #[tokio::test]
    async fn lookup_is_stored_with_timestamp() {
        let source = StaticWhois {
            organization: String::from("Example Inc."),
            ..StaticWhois::default()
        };
        let mut domain = domain();

        probe_whois(&mut domain, &source).await.unwrap();

        let record = domain.whois.as_ref().unwrap();
        assert_eq!(record.domain_name, "example.com");
        assert!(record.last_updated.is_some());
    }

    #[tokio::test]
    async fn reverse_merges_matches_with_organisation() {
        let source = StaticWhois {
            organization: String::from("  Example Inc. "),
            matches: vec![
                String::from("example.com"),
                String::from("example.net"),
                String::from(" example-store.org "),
                String::new(),
            ],
            ..StaticWhois::default()
        };
        let mut domain = domain();
        probe_whois(&mut domain, &source).await.unwrap();

        probe_reverse_whois(&mut domain, &source).await.unwrap();

        assert_eq!(*source.searched.lock().unwrap(), ["Example Inc."]);
        let keys: Vec<_> = domain.reverse_whois_domains.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["example-store.org", "example.net"]);
        assert!(domain
            .reverse_whois_domains
            .iter()
            .all(|r| r.payload.organization == "Example Inc."));
    }

    #[tokio::test]
    async fn reverse_needs_disclosed_registrant() {
        let source = StaticWhois {
            organization: String::from("Not Disclosed"),
            matches: vec![String::from("example.net")],
            ..StaticWhois::default()
        };
        let mut domain = domain();

        let err = probe_reverse_whois(&mut domain, &source).await.unwrap_err();
        assert!(matches!(err, ReconError::NoRegistrant));

        probe_whois(&mut domain, &source).await.unwrap();
        let err = probe_reverse_whois(&mut domain, &source).await.unwrap_err();
        assert!(matches!(err, ReconError::NoRegistrant));
        assert!(source.searched.lock().unwrap().is_empty());
    }
}
