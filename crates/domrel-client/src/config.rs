//! Client configuration types.

use std::path::Path;
use std::time::Duration;

use domrel_core::{DomrelError, Result};
use serde::{Deserialize, Serialize};

/// WhoisXML WHOIS lookup endpoint
pub const DEFAULT_WHOIS_URL: &str = "https://www.whoisxmlapi.com/whoisserver/WhoisService";

/// WhoisXML reverse WHOIS endpoint
pub const DEFAULT_REVERSE_WHOIS_URL: &str = "https://reverse-whois.whoisxmlapi.com/api/v2";

/// Network settings shared by every probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// TLS handshake timeout in seconds, used by the certificate probe
    #[serde(default = "default_handshake_timeout")]
    pub tls_handshake_timeout_secs: u64,

    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional proxy for all HTTP traffic
    #[serde(default)]
    pub proxy: Option<String>,

    /// Redirect hops followed before giving up
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// WhoisXML API credentials and endpoints
    #[serde(default)]
    pub whois: WhoisApiConfig,
}

/// WhoisXML API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisApiConfig {
    /// API key; WHOIS probes fail with a configuration error without it
    #[serde(default)]
    pub api_key: Option<String>,

    /// WHOIS lookup endpoint
    #[serde(default = "default_whois_url")]
    pub lookup_url: String,

    /// Reverse WHOIS endpoint
    #[serde(default = "default_reverse_whois_url")]
    pub reverse_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            tls_handshake_timeout_secs: default_handshake_timeout(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
            proxy: None,
            max_redirects: default_max_redirects(),
            whois: WhoisApiConfig::default(),
        }
    }
}

impl Default for WhoisApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            lookup_url: default_whois_url(),
            reverse_url: default_reverse_whois_url(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file, or defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| DomrelError::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// TCP connect timeout
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// TLS handshake timeout
    #[must_use]
    pub const fn tls_handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_handshake_timeout_secs)
    }

    /// Whole-request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

const fn default_connect_timeout() -> u64 {
    5
}

const fn default_handshake_timeout() -> u64 {
    5
}

const fn default_request_timeout() -> u64 {
    10
}

const fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("domrel/{}", env!("CARGO_PKG_VERSION"))
}

fn default_whois_url() -> String {
    String::from(DEFAULT_WHOIS_URL)
}

fn default_reverse_whois_url() -> String {
    String::from(DEFAULT_REVERSE_WHOIS_URL)
}
