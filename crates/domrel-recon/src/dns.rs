//! DNS probe: A, AAAA and MX relationships plus the SOA snapshot.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use domrel_core::merge::merge_keys;
use domrel_core::{DiscoveryMethod, DnsRecordType, Domain, SoaRecord};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use tracing::{debug, warn};

use crate::error::{ReconError, ReconResult};

/// One answer from a DNS lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsAnswer {
    /// A or AAAA
    Address(IpAddr),
    /// MX exchange host
    MailExchange(String),
    /// SOA fields
    Soa {
        /// Primary name server
        ns: String,
        /// Responsible mailbox
        mbox: String,
        /// Zone serial
        serial: u32,
    },
}

/// Source of DNS answers
#[async_trait]
pub trait DnsSource: Send + Sync {
    /// Answers of `record_type` for `name`; an empty answer is not an error
    async fn lookup(&self, name: &str, record_type: DnsRecordType) -> ReconResult<Vec<DnsAnswer>>;
}

/// Resolver querying Google public DNS
pub struct HickoryDns {
    resolver: TokioResolver,
    timeout: Duration,
}

impl HickoryDns {
    /// Per-query timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Resolver against 8.8.8.8 / 8.8.4.4
    #[must_use]
    pub fn google() -> Self {
        Self::with_config(ResolverConfig::google(), Self::DEFAULT_TIMEOUT)
    }

    /// Resolver with an explicit upstream configuration
    #[must_use]
    pub fn with_config(config: ResolverConfig, timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;

        let resolver =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
                .with_options(opts)
                .build();

        Self { resolver, timeout }
    }

    async fn query(&self, name: &str, record_type: DnsRecordType) -> ReconResult<Vec<DnsAnswer>> {
        let answers = match record_type {
            DnsRecordType::A => self
                .resolver
                .ipv4_lookup(name)
                .await
                .map(|lookup| {
                    lookup
                        .iter()
                        .map(|a| DnsAnswer::Address(IpAddr::V4(a.0)))
                        .collect()
                }),
            DnsRecordType::Aaaa => self
                .resolver
                .ipv6_lookup(name)
                .await
                .map(|lookup| {
                    lookup
                        .iter()
                        .map(|aaaa| DnsAnswer::Address(IpAddr::V6(aaaa.0)))
                        .collect()
                }),
            DnsRecordType::Mx => self.resolver.mx_lookup(name).await.map(|lookup| {
                lookup
                    .iter()
                    .map(|mx| DnsAnswer::MailExchange(host_name(&mx.exchange().to_string())))
                    .collect()
            }),
            DnsRecordType::Soa => self.resolver.soa_lookup(name).await.map(|lookup| {
                lookup
                    .iter()
                    .map(|soa| DnsAnswer::Soa {
                        ns: host_name(&soa.mname().to_string()),
                        mbox: host_name(&soa.rname().to_string()),
                        serial: soa.serial(),
                    })
                    .collect()
            }),
        };

        match answers {
            Ok(answers) => Ok(answers),
            Err(e) if e.is_no_records_found() => Ok(Vec::new()),
            Err(e) => Err(ReconError::Dns(e.to_string())),
        }
    }
}

#[async_trait]
impl DnsSource for HickoryDns {
    async fn lookup(&self, name: &str, record_type: DnsRecordType) -> ReconResult<Vec<DnsAnswer>> {
        debug!(name, record_type = %record_type, "DNS lookup");
        tokio::time::timeout(self.timeout, self.query(name, record_type))
            .await
            .map_err(|_| ReconError::Timeout(self.timeout.as_secs()))?
    }
}

const RECORD_TYPES: [DnsRecordType; 4] = [
    DnsRecordType::A,
    DnsRecordType::Aaaa,
    DnsRecordType::Mx,
    DnsRecordType::Soa,
];

/// Name without the trailing root dot
fn host_name(fqdn: &str) -> String {
    fqdn.trim_end_matches('.').to_ascii_lowercase()
}

/// Run every DNS lookup for `domain` and fold the answers in.
///
/// The four lookups run concurrently. A, AAAA and MX answers are merged;
/// SOA replaces the previous snapshot. A failing record type does not stop
/// the others; all failures are returned together.
pub async fn probe_dns(domain: &mut Domain, source: &dyn DnsSource) -> ReconResult<()> {
    let name = domain.name().to_string();
    let lookups = futures_util::future::join_all(
        RECORD_TYPES.map(|record_type| source.lookup(&name, record_type)),
    )
    .await;

    let mut failures = Vec::new();
    for (record_type, result) in RECORD_TYPES.into_iter().zip(lookups) {
        let answers = match result {
            Ok(answers) => answers,
            Err(e) => {
                warn!(domain = %name, record_type = %record_type, error = %e, "DNS lookup failed");
                failures.push(format!("{record_type}: {e}"));
                continue;
            }
        };

        let set = match record_type {
            DnsRecordType::A => &mut domain.a_records,
            DnsRecordType::Aaaa => &mut domain.aaaa_records,
            DnsRecordType::Mx => &mut domain.mx_records,
            DnsRecordType::Soa => {
                domain.soa_records = soa_snapshot(answers);
                continue;
            }
        };

        let keys = answers.into_iter().filter_map(|answer| match answer {
            DnsAnswer::Address(ip) => Some(ip.to_string()),
            DnsAnswer::MailExchange(host) => Some(host),
            DnsAnswer::Soa { .. } => None,
        });
        let prior = std::mem::take(set);
        *set = merge_keys(&name, DiscoveryMethod::Dns, prior, keys, Utc::now());
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ReconError::DnsLookups(failures))
    }
}

fn soa_snapshot(answers: Vec<DnsAnswer>) -> Vec<SoaRecord> {
    let now = Utc::now();
    answers
        .into_iter()
        .filter_map(|answer| match answer {
            DnsAnswer::Soa { ns, mbox, serial } => Some(SoaRecord {
                created_at: now,
                ns,
                mbox,
                serial,
            }),
            _ => None,
        })
        .collect()
}
