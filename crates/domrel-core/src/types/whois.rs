use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registrant organisation values that carry no information
const UNDISCLOSED: &[&str] = &["", "Not Disclosed"];

/// Contact block of a WHOIS record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhoisContact {
    /// Contact name
    pub name: String,
    /// Organisation
    pub organization: String,
    /// Street lines
    pub street1: String,
    /// Street line 2
    pub street2: String,
    /// Street line 3
    pub street3: String,
    /// Street line 4
    pub street4: String,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// Postal code
    pub postal_code: String,
    /// Country name
    pub country: String,
    /// ISO country code
    pub country_code: String,
    /// Email address
    pub email: String,
    /// Telephone number
    pub telephone: String,
    /// Telephone extension
    pub telephone_ext: String,
    /// Fax number
    pub fax: String,
    /// Fax extension
    pub fax_ext: String,
}

/// Parsed WHOIS record for a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhoisData {
    /// Domain the record describes
    pub domain_name: String,
    /// Registration date as reported by the registry
    pub created_date: Option<String>,
    /// Last registry update as reported by the registry
    pub updated_date: Option<String>,
    /// Registrar name
    pub registrar_name: String,
    /// Registrar IANA identifier
    #[serde(rename = "registrarIANAID")]
    pub registrar_iana_id: String,
    /// Domain status codes
    pub status: String,
    /// Registrant contact
    pub registrant: WhoisContact,
    /// Administrative contact
    pub administrative_contact: WhoisContact,
    /// Technical contact
    pub technical_contact: WhoisContact,
    /// Billing contact
    pub billing_contact: WhoisContact,
    /// Zone contact
    pub zone_contact: WhoisContact,
    /// Raw header text
    pub header: String,
    /// Raw footer text
    pub footer: String,
    /// Estimated age in days
    pub estimated_domain_age: i64,
    /// IP addresses listed in the record
    pub ips: Vec<String>,
    /// When the record was fetched
    #[serde(rename = "lastRanWhois", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl WhoisData {
    /// Registrant organisation, if it is usable as a reverse WHOIS search term
    #[must_use]
    pub fn registrant_organization(&self) -> Option<&str> {
        let org = self.registrant.organization.trim();
        (!UNDISCLOSED.contains(&org)).then_some(org)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_whoisxml_shape() {
        let json = r#"{
            "domainName": "example.com",
            "createdDate": "1995-08-14T04:00:00Z",
            "registrarName": "RESERVED-Internet Assigned Numbers Authority",
            "registrarIANAID": "376",
            "registrant": {"organization": "Internet Assigned Numbers Authority", "countryCode": "US"},
            "estimatedDomainAge": 10660,
            "ips": ["93.184.216.34"]
        }"#;

        let data: WhoisData = serde_json::from_str(json).unwrap();
        assert_eq!(data.domain_name, "example.com");
        assert_eq!(data.registrar_iana_id, "376");
        assert_eq!(data.registrant.country_code, "US");
        assert_eq!(
            data.registrant_organization(),
            Some("Internet Assigned Numbers Authority")
        );
        assert!(data.last_updated.is_none());
    }

    #[test]
    fn undisclosed_registrant_is_unusable() {
        let mut data = WhoisData::default();
        assert_eq!(data.registrant_organization(), None);
        data.registrant.organization = "Not Disclosed".into();
        assert_eq!(data.registrant_organization(), None);
    }
}
