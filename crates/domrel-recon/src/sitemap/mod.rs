//! Sitemap discovery: robots.txt seeds, bounded crawl, web and contact
//! domains.

pub mod crawl;
mod parse;
mod probe;

pub use crawl::{CrawlFailure, CrawlHalt, CrawlOutcome, Fetch, SitemapCrawler};
pub use parse::{parse_sitemap_index, parse_url_set};
pub use probe::{SitemapProbe, SitemapReport};
