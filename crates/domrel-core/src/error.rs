use thiserror::Error;

/// Result type alias for domrel operations
pub type Result<T> = std::result::Result<T, DomrelError>;

/// Errors that can occur while enriching a domain
#[derive(Error, Debug)]
pub enum DomrelError {
    /// The name has no match in the public suffix list
    #[error("not a public domain: {0}")]
    NotPublic(String),

    /// Remote server answered with a non-success status
    #[error("unexpected status {code} from {url}")]
    Status {
        /// HTTP status code
        code: u16,
        /// URL that was requested
        url: String,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// WHOIS lookup failed
    #[error("WHOIS lookup failed: {0}")]
    Whois(String),

    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    /// TLS dial or certificate decoding failed
    #[error("TLS probe failed: {0}")]
    Tls(String),

    /// Sitemap or robots.txt probe failed
    #[error("sitemap probe failed: {0}")]
    Sitemap(String),

    /// The operation was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DomrelError {
    /// Returns the HTTP status code if the error carries one
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}
