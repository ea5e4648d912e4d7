//! Third-party API endpoints.

mod whois;

pub use whois::*;
