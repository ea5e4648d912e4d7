//! WhoisXML API endpoints.

use crate::DomrelClient;
use domrel_core::{DomrelError, Result, WhoisData};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Environment variable consulted when no API key is configured
pub const WHOIS_API_KEY_ENV: &str = "WHOIS_XML_API_KEY";

/// WhoisXML endpoints
pub struct WhoisApi<'a> {
    client: &'a DomrelClient,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(rename = "WhoisRecord")]
    record: Option<WhoisData>,
    #[serde(rename = "ErrorMessage")]
    error: Option<ApiMessage>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    msg: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReverseRequest<'a> {
    api_key: &'a str,
    mode: &'static str,
    basic_search_terms: SearchTerms<'a>,
}

#[derive(Serialize)]
struct SearchTerms<'a> {
    include: [&'a str; 1],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReverseResponse {
    #[serde(default)]
    domains_list: Vec<String>,
}

impl<'a> WhoisApi<'a> {
    pub(crate) const fn new(client: &'a DomrelClient) -> Self {
        Self { client }
    }

    fn api_key(&self) -> Result<String> {
        self.client
            .config()
            .whois
            .api_key
            .clone()
            .or_else(|| std::env::var(WHOIS_API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| DomrelError::Config(format!("WhoisXML API key not set ({WHOIS_API_KEY_ENV})")))
    }

    /// Look up the WHOIS record of `domain`
    #[instrument(skip(self), fields(provider = "whoisxml"))]
    pub async fn lookup(&self, domain: &str) -> Result<WhoisData> {
        let key = self.api_key()?;
        let response: LookupResponse = self
            .client
            .get_json(
                &self.client.config().whois.lookup_url,
                &[
                    ("apiKey", key.as_str()),
                    ("domainName", domain),
                    ("outputFormat", "JSON"),
                ],
            )
            .await?;

        match (response.record, response.error) {
            (Some(record), _) => Ok(record),
            (None, Some(error)) => Err(DomrelError::Whois(error.msg)),
            (None, None) => Err(DomrelError::Whois(format!("no WHOIS record for {domain}"))),
        }
    }

    /// Domains registered by `organization`
    #[instrument(skip(self), fields(provider = "whoisxml"))]
    pub async fn reverse(&self, organization: &str) -> Result<Vec<String>> {
        let key = self.api_key()?;
        let request = ReverseRequest {
            api_key: &key,
            mode: "purchase",
            basic_search_terms: SearchTerms {
                include: [organization],
            },
        };

        let response: ReverseResponse = self
            .client
            .post_json(&self.client.config().whois.reverse_url, &request)
            .await?;

        debug!(count = response.domains_list.len(), "reverse WHOIS matches");
        Ok(response.domains_list)
    }
}

#[cfg(test)]
mod tests {
    use crate::DomrelClient;
    use domrel_core::DomrelError;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DomrelClient {
        DomrelClient::builder()
            .whois_api_key("at_test")
            .whois_urls(
                format!("{}/whoisserver/WhoisService", server.uri()),
                format!("{}/api/v2", server.uri()),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn lookup_decodes_whois_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/whoisserver/WhoisService"))
            .and(query_param("apiKey", "at_test"))
            .and(query_param("domainName", "example.com"))
            .and(query_param("outputFormat", "JSON"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "WhoisRecord": {
                    "domainName": "example.com",
                    "registrarName": "Example Registrar, Inc.",
                    "registrarIANAID": "376",
                    "estimatedDomainAge": 10_000,
                    "registrant": { "organization": "Example Inc" },
                    "ips": ["93.184.216.34"]
                }
            })))
            .mount(&server)
            .await;

        let record = client_for(&server).whois().lookup("example.com").await.unwrap();
        assert_eq!(record.domain_name, "example.com");
        assert_eq!(record.registrar_iana_id, "376");
        assert_eq!(record.registrant_organization(), Some("Example Inc"));
        assert_eq!(record.ips, ["93.184.216.34"]);
    }

    #[tokio::test]
    async fn lookup_surfaces_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/whoisserver/WhoisService"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ErrorMessage": { "errorCode": "WHOIS_01", "msg": "invalid domain name" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).whois().lookup("bad").await.unwrap_err();
        assert!(matches!(err, DomrelError::Whois(msg) if msg == "invalid domain name"));
    }

    #[tokio::test]
    async fn reverse_posts_purchase_search() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2"))
            .and(body_json(json!({
                "apiKey": "at_test",
                "mode": "purchase",
                "basicSearchTerms": { "include": ["Example Inc"] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "domainsCount": 2,
                "domainsList": ["example-shop.com", "example.net"]
            })))
            .mount(&server)
            .await;

        let domains = client_for(&server)
            .whois()
            .reverse("Example Inc")
            .await
            .unwrap();
        assert_eq!(domains, ["example-shop.com", "example.net"]);
    }

    #[tokio::test]
    async fn reverse_maps_http_failure_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .whois()
            .reverse("Example Inc")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(403));
    }
}
