//! HTTP client for domain relationship probes.
//!
//! [`DomrelClient`] is built once from a [`ClientConfig`] and shared by every
//! probe that talks HTTP: sitemap and robots.txt fetches, contact pages,
//! redirect chains and the WhoisXML API.

mod client;
mod config;
pub mod api;

pub use client::{DomrelClient, DomrelClientBuilder, FetchedPage, RedirectChain};
pub use config::*;
pub use domrel_core::{DomrelError, Result};
