use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DNS record types queried by the DNS probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Mail exchanger
    Mx,
    /// Start of authority
    Soa,
}

impl std::fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Aaaa => write!(f, "AAAA"),
            Self::Mx => write!(f, "MX"),
            Self::Soa => write!(f, "SOA"),
        }
    }
}

/// Start of authority answer.
///
/// SOA is a snapshot of the zone, not a relationship: the DNS probe replaces
/// the whole list on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoaRecord {
    /// When this answer was observed
    pub created_at: DateTime<Utc>,

    /// Primary name server
    pub ns: String,

    /// Responsible mailbox
    pub mbox: String,

    /// Zone serial number
    pub serial: u32,
}
