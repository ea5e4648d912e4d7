use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signal source that produced a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// A, AAAA or MX answer
    Dns,
    /// Subject Alternative Name on the served certificate
    CertSan,
    /// Hostname seen while following HTTP redirects
    WebRedirect,
    /// Hostname of a URL listed in a sitemap
    SitemapWeb,
    /// Email domain found on a sitemap contact page
    SitemapContact,
    /// Domain registered by the same WHOIS registrant
    ReverseWhois,
}

impl DiscoveryMethod {
    /// Stable lowercase label, used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::CertSan => "cert_san",
            Self::WebRedirect => "web_redirect",
            Self::SitemapWeb => "sitemap_web",
            Self::SitemapContact => "sitemap_contact",
            Self::ReverseWhois => "reverse_whois",
        }
    }
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probe-specific data carried by a relationship record.
///
/// `refresh` is called when a key is observed again; the default keeps the
/// stored payload untouched.
pub trait MergePayload: Clone {
    /// Fold a re-observed payload into the stored one
    fn refresh(&mut self, fresh: Self) {
        let _ = fresh;
    }

    /// Whether the payload carries nothing worth serializing
    fn is_empty(&self) -> bool {
        false
    }
}

impl MergePayload for () {
    fn is_empty(&self) -> bool {
        true
    }
}

/// Registrant organisation that led to a reverse WHOIS match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantMatch {
    /// Organisation searched for
    pub organization: String,
}

impl MergePayload for RegistrantMatch {
    fn refresh(&mut self, fresh: Self) {
        *self = fresh;
    }
}

/// One discovered edge between the subject domain and something related to it.
///
/// The key is the related domain's canonical name, or for DNS the raw
/// answer value (IP literal, MX host).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(
        serialize = "P: Serialize + MergePayload",
        deserialize = "P: Deserialize<'de> + Default"
    )
)]
pub struct RelationshipRecord<P = ()> {
    /// Related domain, IP literal or MX target
    pub key: String,

    /// How the relationship was discovered
    pub method: DiscoveryMethod,

    /// First observation, never changes afterwards
    pub created_at: DateTime<Utc>,

    /// Latest observation
    pub updated_at: DateTime<Utc>,

    /// Probe-specific fields
    #[serde(default, skip_serializing_if = "MergePayload::is_empty")]
    pub payload: P,
}

impl<P: MergePayload> RelationshipRecord<P> {
    /// Record first observed at `now`
    #[must_use]
    pub fn observed(
        key: impl Into<String>,
        method: DiscoveryMethod,
        payload: P,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            method,
            created_at: now,
            updated_at: now,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_payload_is_not_serialized() {
        let now = Utc::now();
        let record = RelationshipRecord::observed("example.org", DiscoveryMethod::CertSan, (), now);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["key"], "example.org");
        assert_eq!(json["method"], "cert_san");
        assert!(json.get("payload").is_none());

        let parsed: RelationshipRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn registrant_payload_overwrites_on_refresh() {
        let mut stored = RegistrantMatch {
            organization: "Old Org".into(),
        };
        stored.refresh(RegistrantMatch {
            organization: "New Org".into(),
        });
        assert_eq!(stored.organization, "New Org");
    }

    #[test]
    fn registrant_payload_is_serialized() {
        let now = Utc::now();
        let record = RelationshipRecord::observed(
            "example.net",
            DiscoveryMethod::ReverseWhois,
            RegistrantMatch {
                organization: "Example Inc.".into(),
            },
            now,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["payload"]["organization"], "Example Inc.");

        let parsed: RelationshipRecord<RegistrantMatch> = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn missing_payload_defaults() {
        let json = serde_json::json!({
            "key": "example.net",
            "method": "reverse_whois",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z",
        });
        let parsed: RelationshipRecord<RegistrantMatch> = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.payload, RegistrantMatch::default());
    }
}
