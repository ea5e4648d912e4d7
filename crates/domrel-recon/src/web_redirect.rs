//! HTTP redirect chain probe.

use chrono::Utc;
use domrel_client::{DomrelClient, RedirectChain};
use domrel_core::merge::merge_keys;
use domrel_core::{Canonicalize, DiscoveryMethod, Domain};
use tracing::{debug, info, warn};

use crate::error::ReconResult;

/// Canonical domains of every host visited along `chain`
pub fn hop_domains(chain: &RedirectChain, canonicalizer: &dyn Canonicalize) -> Vec<String> {
    chain
        .hops
        .iter()
        .filter_map(|hop| hop.host_str())
        .filter_map(|host| match canonicalizer.canonicalize(host) {
            Ok(name) => Some(name.domain),
            Err(e) => {
                debug!(host, error = %e, "dropping redirect host");
                None
            }
        })
        .collect()
}

/// Follow redirects from `http://<domain>` and merge the visited domains.
pub async fn probe_web_redirect(
    domain: &mut Domain,
    client: &DomrelClient,
    canonicalizer: &dyn Canonicalize,
) -> ReconResult<()> {
    let start = format!("http://{}", domain.name());
    probe_web_redirect_from(domain, client, canonicalizer, &start).await
}

/// Like [`probe_web_redirect`] with an explicit start URL.
///
/// Any answer at the end of the chain counts as a landing, whatever its
/// status. On failure the landing flag is cleared and earlier records are
/// kept.
pub async fn probe_web_redirect_from(
    domain: &mut Domain,
    client: &DomrelClient,
    canonicalizer: &dyn Canonicalize,
    start: &str,
) -> ReconResult<()> {
    let chain = match client.follow_redirects(start).await {
        Ok(chain) => chain,
        Err(e) => {
            warn!(domain = %domain, start, error = %e, "no web landing");
            domain.successful_web_landing = false;
            return Err(e.into());
        }
    };

    domain.successful_web_landing = true;
    domain.web_redirect_url_final = chain.final_url().map(ToString::to_string);

    let keys = hop_domains(&chain, canonicalizer);
    let prior = std::mem::take(&mut domain.web_redirect_domains);
    domain.web_redirect_domains =
        merge_keys(domain.name(), DiscoveryMethod::WebRedirect, prior, keys, Utc::now());

    info!(
        domain = %domain,
        hops = chain.hops.len(),
        status = chain.status,
        landing = domain.web_redirect_url_final.as_deref().unwrap_or_default(),
        "web redirect probe finished"
    );
    Ok(())
}
