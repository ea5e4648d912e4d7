//! Public-suffix canonicalisation backed by the `publicsuffix` crate.
//!
//! Only the ICANN section of the list is used; private registrations such as
//! `blogspot.com` collapse onto their ICANN registrable domain.

use std::path::Path;

use domrel_client::DomrelClient;
use domrel_core::{CanonicalName, Canonicalize, DomrelError};
use publicsuffix::{List, Psl};
use tracing::debug;

use crate::error::{ReconError, ReconResult};

/// Where the maintained list is published
pub const PUBLIC_SUFFIX_LIST_URL: &str = "https://publicsuffix.org/list/public_suffix_list.dat";

const PRIVATE_SECTION_MARKER: &str = "// ===BEGIN PRIVATE DOMAINS===";

/// Parsed public suffix list
pub struct SuffixList {
    list: List,
}

impl SuffixList {
    /// Parse list text, dropping the private section
    pub fn parse(text: &str) -> ReconResult<Self> {
        let icann = text
            .find(PRIVATE_SECTION_MARKER)
            .map_or(text, |start| &text[..start]);
        let list = icann
            .parse::<List>()
            .map_err(|e| ReconError::SuffixList(e.to_string()))?;
        Ok(Self { list })
    }

    /// Load the list from a local copy
    pub fn load(path: &Path) -> ReconResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Download the current list
    pub async fn fetch(client: &DomrelClient) -> ReconResult<Self> {
        let body = client.get_bytes(PUBLIC_SUFFIX_LIST_URL).await?;
        Self::parse(&String::from_utf8_lossy(&body))
    }
}

impl Canonicalize for SuffixList {
    fn canonicalize(&self, raw: &str) -> domrel_core::Result<CanonicalName> {
        let name = raw.trim().trim_end_matches('.').to_ascii_lowercase();
        let not_public = || DomrelError::NotPublic(raw.to_string());

        let domain = self.list.domain(name.as_bytes()).ok_or_else(not_public)?;
        let suffix = domain.suffix();
        if !suffix.is_known() {
            debug!(name = %name, "no public suffix match");
            return Err(not_public());
        }

        let registrable = std::str::from_utf8(domain.as_bytes())
            .map_err(|_| not_public())?
            .to_string();
        let suffix = std::str::from_utf8(suffix.as_bytes())
            .map_err(|_| not_public())?
            .to_string();

        let hostname = registrable
            .strip_suffix(&suffix)
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or_default()
            .to_string();
        let subdomain = name
            .strip_suffix(&registrable)
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or_default()
            .to_string();

        Ok(CanonicalName {
            domain: registrable,
            hostname,
            subdomain,
            suffix,
        })
    }
}
