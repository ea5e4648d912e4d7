mod dns;
mod domain;
mod record;
mod sitemap;
mod whois;

pub use dns::*;
pub use domain::*;
pub use record::*;
pub use sitemap::*;
pub use whois::*;
