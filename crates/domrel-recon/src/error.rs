use domrel_core::DomrelError;
use thiserror::Error;

/// Result type alias for probe operations
pub type ReconResult<T> = std::result::Result<T, ReconError>;

/// Errors from probes and their collaborators
#[derive(Error, Debug)]
pub enum ReconError {
    /// Name has no public suffix match
    #[error("not a public domain: {0}")]
    NotPublic(String),

    /// Public suffix list could not be loaded
    #[error("public suffix list error: {0}")]
    SuffixList(String),

    /// One or more DNS lookups failed
    #[error("DNS lookups failed: {}", .0.join("; "))]
    DnsLookups(Vec<String>),

    /// DNS resolver error
    #[error("DNS error: {0}")]
    Dns(String),

    /// TLS dial, handshake or certificate decoding failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// robots.txt could not be fetched
    #[error("robots.txt unavailable: {0}")]
    Robots(String),

    /// Sitemap document could not be parsed
    #[error("sitemap parse error: {0}")]
    Xml(String),

    /// Sitemap probe needs a successful web landing first
    #[error("domain has not landed on the web")]
    NoWebLanding,

    /// No crawled URL looked like an allowed contact page
    #[error("no contact pages found in sitemap")]
    NoContactPages,

    /// WHOIS record has no usable registrant organisation
    #[error("no usable WHOIS registrant organisation")]
    NoRegistrant,

    /// WHOIS lookup failed
    #[error("WHOIS error: {0}")]
    Whois(String),

    /// HTTP client error
    #[error(transparent)]
    Client(#[from] DomrelError),

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// Timeout
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// Cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,
}

impl ReconError {
    /// Whether the probe stopped before doing any work because a
    /// precondition was not met
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::NoWebLanding | Self::NoRegistrant)
    }
}

impl From<ReconError> for DomrelError {
    fn from(err: ReconError) -> Self {
        match err {
            ReconError::NotPublic(name) => Self::NotPublic(name),
            ReconError::SuffixList(msg) => Self::Config(msg),
            ReconError::Dns(msg) => Self::Dns(msg),
            ReconError::DnsLookups(errors) => Self::Dns(errors.join("; ")),
            ReconError::Tls(msg) => Self::Tls(msg),
            ReconError::Whois(msg) => Self::Whois(msg),
            ReconError::NoRegistrant => Self::Whois(String::from("no usable registrant organisation")),
            ReconError::Client(e) => e,
            ReconError::Network(e) => Self::Io(e),
            ReconError::Timeout(secs) => Self::Timeout(secs),
            ReconError::Cancelled => Self::Cancelled,
            other @ (ReconError::Robots(_)
            | ReconError::Xml(_)
            | ReconError::NoWebLanding
            | ReconError::NoContactPages) => Self::Sitemap(other.to_string()),
        }
    }
}
