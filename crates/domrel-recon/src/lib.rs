//! Relationship probes for registrable domains.
//!
//! Each probe takes a [`Domain`](domrel_core::Domain), gathers raw facts from
//! one signal source and folds them in with the merge engine:
//!
//! - [`dns`]: A, AAAA and MX answers, plus the SOA snapshot
//! - [`web_redirect`]: hosts visited while following HTTP redirects
//! - [`cert_sans`]: Subject Alternative Names of the served certificate
//! - [`sitemap`]: robots.txt sitemaps, crawled hosts and contact-page emails
//! - [`whois`]: WHOIS record and reverse WHOIS by registrant
//!
//! [`DomainEnricher`] runs them in order, honouring per-probe switches and
//! freshness.

#![doc(html_root_url = "https://docs.rs/domrel-recon/0.3.0")]

mod error;

pub mod canonical;
pub mod cert_sans;
pub mod contact;
pub mod dns;
pub mod enrichment;
pub mod robots;
pub mod sitemap;
pub mod web_redirect;
pub mod whois;

pub use canonical::SuffixList;
pub use enrichment::{DomainEnricher, EnrichmentReport};
pub use error::{ReconError, ReconResult};
