//! Contact page selection and email domain extraction.

use std::time::Duration;

use domrel_core::Canonicalize;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::robots::{RuleSet, ANY_AGENT};
use crate::sitemap::Fetch;

/// Email addresses on the TLDs worth following.
///
/// Boundaries are checked separately in [`scan_emails`] because the regex
/// engine has no lookaround.
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.(?:com|net|org|edu|gov|info|biz|io|co\.uk|co|us|de|ca)",
    )
    .expect("email pattern is valid")
});

const LEADING_DELIMITERS: &[char] = &[',', ';', ':', '<', '>', '"', '\'', '(', '['];
const TRAILING_DELIMITERS: &[char] = &[',', ';', '<', '>', '"', '\'', ')', ']'];

/// Crawled URLs that look like contact pages and robots.txt allows
pub fn select_contact_pages(urls: &[String], rules: &dyn RuleSet, limit: usize) -> Vec<String> {
    urls.iter()
        .filter(|url| url.contains("contact"))
        .filter(|url| rules.is_allowed(url, ANY_AGENT))
        .take(limit)
        .cloned()
        .collect()
}

/// Email addresses in `text`, each delimited by whitespace, punctuation or
/// markup on both sides
pub fn scan_emails(text: &str) -> Vec<String> {
    EMAIL_PATTERN
        .find_iter(text)
        .filter(|m| {
            let before = text[..m.start()].chars().next_back();
            let mut after = text[m.end()..].chars();
            let leading_ok = before.map_or(true, |c| c.is_whitespace() || LEADING_DELIMITERS.contains(&c));
            let trailing_ok = match after.next() {
                None => true,
                Some('.') => after.next().map_or(true, char::is_whitespace),
                Some(c) => c.is_whitespace() || TRAILING_DELIMITERS.contains(&c),
            };
            leading_ok && trailing_ok
        })
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Canonical domains of the emails in `text`
pub fn email_domains(text: &str, canonicalizer: &dyn Canonicalize) -> Vec<String> {
    scan_emails(text)
        .iter()
        .filter_map(|email| email.rsplit_once('@').map(|(_, host)| host))
        .filter_map(|host| match canonicalizer.canonicalize(host) {
            Ok(name) => Some(name.domain),
            Err(e) => {
                warn!(host, error = %e, "dropping email domain");
                None
            }
        })
        .collect()
}

/// Fetch each contact page and collect the email domains it mentions.
///
/// Pages that fail to load are skipped. Stops early on cancellation and
/// returns what was collected.
pub async fn collect_contact_domains<F: Fetch + ?Sized>(
    fetcher: &F,
    pages: &[String],
    canonicalizer: &dyn Canonicalize,
    fetch_timeout: Duration,
    cancel: &CancellationToken,
) -> Vec<String> {
    let mut domains = Vec::new();

    for page in pages {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = tokio::time::timeout(fetch_timeout, fetcher.fetch(page.trim())) => result,
        };

        let body = match result {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                warn!(page = %page, error = %e, "contact page fetch failed");
                continue;
            }
            Err(_) => {
                warn!(page = %page, "contact page fetch timed out");
                continue;
            }
        };

        let found = email_domains(&String::from_utf8_lossy(&body), canonicalizer);
        debug!(page = %page, domains = found.len(), "contact page scanned");
        domains.extend(found);
    }

    domains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::tests::suffixes;
    use crate::robots::RobotsRules;
    use crate::sitemap::crawl::tests::StaticSite;

    #[test]
    fn finds_both_addresses_in_prose() {
        let emails = scan_emails("Reach us at ops@example.com or sales@example.org");
        assert_eq!(emails, ["ops@example.com", "sales@example.org"]);
    }

    #[test]
    fn respects_boundaries() {
        let text = "<a href=\"mailto:info@example.net\">info@example.net</a>, \
                    support@example.co.uk. bad@example.community x@example.com.au";
        assert_eq!(
            scan_emails(text),
            ["info@example.net", "info@example.net", "support@example.co.uk"]
        );
    }

    #[test]
    fn ignores_unlisted_tlds() {
        assert!(scan_emails("hello@example.xyz").is_empty());
    }

    #[test]
    fn email_domains_are_canonicalised() {
        let domains = email_domains("ops@mail.Example.com; bad@intranet.corp", &suffixes());
        assert_eq!(domains, ["example.com"]);
    }

    #[test]
    fn selection_filters_and_caps() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /private/\n");
        let urls: Vec<String> = [
            "https://example.com/",
            "https://example.com/contact",
            "https://example.com/private/contact",
            "https://example.com/contact-us",
            "https://example.com/about/contact",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let pages = select_contact_pages(&urls, &rules, 2);
        assert_eq!(
            pages,
            ["https://example.com/contact", "https://example.com/contact-us"]
        );
    }

    #[test]
    fn collects_domains_from_reachable_pages() {
        let site = StaticSite::default().page(
            "https://example.com/contact",
            "<p>Reach us at ops@example.com or sales@example.org</p>",
        );
        let pages = vec![
            "https://example.com/contact".to_string(),
            "https://example.com/contact-missing".to_string(),
        ];

        let domains = tokio_test::block_on(collect_contact_domains(
            &site,
            &pages,
            &suffixes(),
            Duration::from_secs(1),
            &CancellationToken::new(),
        ));
        assert_eq!(domains, ["example.com", "example.org"]);
    }
}
