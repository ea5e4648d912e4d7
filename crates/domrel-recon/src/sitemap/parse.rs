//! Sitemap XML decoding.
//!
//! Both decoders read the same loose shape: a root element whose direct
//! children are `<sitemap>` (index) or `<url>` (URL set) entries, each holding
//! a `<loc>`. No schema is enforced, so one document may yield both.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ReconError, ReconResult};

/// Child sitemap locations listed by an index document
pub fn parse_sitemap_index(xml: &[u8]) -> ReconResult<Vec<String>> {
    collect_locs(xml, b"sitemap")
}

/// Page URLs listed by a URL set document
pub fn parse_url_set(xml: &[u8]) -> ReconResult<Vec<String>> {
    collect_locs(xml, b"url")
}

/// `<loc>` text of every `<entry>` directly under the root element
fn collect_locs(xml: &[u8], entry: &[u8]) -> ReconResult<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut in_entry = false;
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                saw_root = true;
                let name = e.local_name();
                if depth == 2 && name.as_ref() == entry {
                    in_entry = true;
                } else if depth == 3 && in_entry && name.as_ref() == b"loc" {
                    in_loc = true;
                    current.clear();
                }
            }
            Ok(Event::Empty(_)) => saw_root = true,
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if depth == 3 && in_loc && name.as_ref() == b"loc" {
                    in_loc = false;
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                } else if depth == 2 && in_entry {
                    in_entry = false;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) if in_loc => {
                let text = e.unescape().map_err(|e| ReconError::Xml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::CData(e)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) if depth > 0 => {
                return Err(ReconError::Xml(String::from("unexpected end of document")))
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ReconError::Xml(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if saw_root {
        Ok(locs)
    } else {
        Err(ReconError::Xml(String::from("document has no root element")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/posts.xml</loc><lastmod>2024-01-01</lastmod></sitemap>
  <sitemap>
    <loc>
      https://example.com/pages.xml
    </loc>
  </sitemap>
  <sitemap><loc></loc></sitemap>
</sitemapindex>"#;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/</loc></url>
  <url><loc><![CDATA[https://example.com/contact?a=1&b=2]]></loc></url>
  <url><loc>https://example.com/about?x=1&amp;y=2</loc></url>
</urlset>"#;

    #[test]
    fn index_children_are_read() {
        let children = parse_sitemap_index(INDEX.as_bytes()).unwrap();
        assert_eq!(
            children,
            ["https://example.com/posts.xml", "https://example.com/pages.xml"]
        );
        assert!(parse_url_set(INDEX.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn url_set_handles_cdata_and_entities() {
        let urls = parse_url_set(URLSET.as_bytes()).unwrap();
        assert_eq!(
            urls,
            [
                "https://example.com/",
                "https://example.com/contact?a=1&b=2",
                "https://example.com/about?x=1&y=2",
            ]
        );
        assert!(parse_sitemap_index(URLSET.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn mixed_document_yields_both_shapes() {
        let xml = br#"<root>
  <sitemap><loc>https://example.com/child.xml</loc></sitemap>
  <url><loc>https://example.com/page</loc></url>
</root>"#;
        assert_eq!(parse_sitemap_index(xml).unwrap(), ["https://example.com/child.xml"]);
        assert_eq!(parse_url_set(xml).unwrap(), ["https://example.com/page"]);
    }

    #[test]
    fn nested_entries_are_not_direct_children() {
        let xml = br#"<urlset><group><url><loc>https://example.com/deep</loc></url></group></urlset>"#;
        assert!(parse_url_set(xml).unwrap().is_empty());
    }

    #[test]
    fn malformed_documents_fail() {
        assert!(parse_url_set(b"<urlset><url><loc>x</url></urlset>").is_err());
        assert!(parse_url_set(b"").is_err());
        assert!(parse_url_set(b"just some text").is_err());
        assert!(parse_url_set(b"<html><body>truncated").is_err());
    }
}
