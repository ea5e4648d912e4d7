//! Domain relationship aggregation.
//!
//! Enriches a registrable domain with evidence of related domains gathered
//! from DNS, TLS certificate SANs, HTTP redirect chains, sitemap and
//! contact-page crawling, and WHOIS / reverse WHOIS. Every finding is kept as
//! a timestamped [`RelationshipRecord`] tagged with its [`DiscoveryMethod`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use domrel::recon::{DomainEnricher, SuffixList};
//! use domrel::{Domain, DomrelClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DomrelClient::new()?;
//!     let suffixes = Arc::new(SuffixList::fetch(&client).await?);
//!
//!     let mut domain = Domain::new("www.example.com", suffixes.as_ref())?;
//!     let enricher = DomainEnricher::new(client, suffixes).with_default_sources()?;
//!
//!     let report = enricher.enrich(&mut domain).await;
//!     println!("ran {:?}, {} errors", report.ran, report.errors.len());
//!     println!("{:#?}", domain.matched_domains());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - `rustls` and `recon`
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS
//! - `recon` - Probes, sitemap crawler and the enrichment orchestrator

#![doc(html_root_url = "https://docs.rs/domrel/0.3.0")]

// Re-export core types
pub use domrel_core::*;

// Re-export client
pub use domrel_client::{ClientConfig, DomrelClient, DomrelClientBuilder};

// Re-export recon if enabled
#[cfg(feature = "recon")]
pub use domrel_recon as recon;

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;
