//! Core types, merge engine and errors for domain relationship aggregation.
//!
//! This crate holds everything the probes share:
//!
//! - **Types**: the [`Domain`] aggregate, [`RelationshipRecord`] and sitemap
//!   crawl state
//! - **Merge**: [`merge`](merge::merge), the fold every probe uses to grow a
//!   record set without losing history
//! - **Config**: [`EnrichmentConfig`] and [`CrawlLimits`]
//! - **Errors**: [`DomrelError`]
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use domrel_core::{merge::merge_keys, DiscoveryMethod};
//!
//! let records = merge_keys(
//!     "example.com",
//!     DiscoveryMethod::CertSan,
//!     Vec::new(),
//!     ["example.net", "example.com"],
//!     Utc::now(),
//! );
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].key, "example.net");
//! ```

pub mod config;
mod error;
pub mod merge;
pub mod types;

pub use config::EnrichmentConfig;
pub use error::{DomrelError, Result};
pub use types::*;
