//! Shared HTTP client implementation.

use crate::api::WhoisApi;
use crate::config::ClientConfig;
use domrel_core::{DomrelError, Result};
use reqwest::redirect::Policy;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// HTTP client shared by every probe
#[derive(Clone)]
pub struct DomrelClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    no_redirect: HttpClient,
    config: ClientConfig,
}

/// A fetched page, whatever its status
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,
    /// Response body decoded as text
    pub body: String,
}

impl FetchedPage {
    /// 2xx
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Every URL visited while following redirects from a start URL
#[derive(Debug, Clone)]
pub struct RedirectChain {
    /// Visited URLs in order, start URL first, final URL last
    pub hops: Vec<Url>,
    /// Status of the final response
    pub status: u16,
}

impl RedirectChain {
    /// Where the chain ended
    #[must_use]
    pub fn final_url(&self) -> Option<&Url> {
        self.hops.last()
    }
}

impl DomrelClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        DomrelClientBuilder::new().build()
    }

    /// Create a client from a loaded configuration
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        DomrelClientBuilder::from_config(config).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> DomrelClientBuilder {
        DomrelClientBuilder::new()
    }

    /// Settings the client was built with
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Access WhoisXML endpoints
    #[must_use]
    pub fn whois(&self) -> WhoisApi<'_> {
        WhoisApi::new(self)
    }

    /// GET `url` and return the body; non-2xx is an error
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomrelError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&e))?;
        Ok(body.to_vec())
    }

    /// GET `url` and return status and body, whatever the status
    pub async fn get_page(&self, url: &str) -> Result<FetchedPage> {
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;
        Ok(FetchedPage { status, body })
    }

    /// GET `start` and follow redirects by hand, recording every hop
    pub async fn follow_redirects(&self, start: &str) -> Result<RedirectChain> {
        let mut current = Url::parse(start).map_err(|e| DomrelError::InvalidUrl(e.to_string()))?;
        let mut hops = vec![current.clone()];
        let max = self.inner.config.max_redirects;

        loop {
            debug!(url = %current, hop = hops.len(), "GET request without redirect");

            let response = self
                .inner
                .no_redirect
                .get(current.clone())
                .send()
                .await
                .map_err(|e| self.transport_error(&e))?;

            let status = response.status();
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|value| value.to_str().ok());

            let next = match location {
                Some(location) if status.is_redirection() => current
                    .join(location)
                    .map_err(|e| DomrelError::InvalidUrl(format!("{location}: {e}")))?,
                _ => {
                    return Ok(RedirectChain {
                        hops,
                        status: status.as_u16(),
                    })
                }
            };

            if hops.len() > max {
                return Err(DomrelError::Http(format!(
                    "stopped after {max} redirects from {start}"
                )));
            }

            hops.push(next.clone());
            current = next;
        }
    }

    /// Perform a GET request with query parameters and decode a JSON body
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        base: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = Url::parse_with_params(base, params)
            .map_err(|e| DomrelError::InvalidUrl(e.to_string()))?;
        debug!(url = %redacted(&url), "GET request");

        let response = self
            .inner
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        self.handle_response(base, response).await
    }

    /// Perform a POST request with JSON body
    pub(crate) async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = %url, "POST request");

        let response = self
            .inner
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        self.handle_response(url, response).await
    }

    /// Decode a JSON response or turn its status into an error
    async fn handle_response<T: DeserializeOwned>(
        &self,
        url: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(DomrelError::Json)
        } else {
            warn!(url = %url, status = status.as_u16(), body = %body, "API request failed");
            Err(DomrelError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            })
        }
    }

    fn transport_error(&self, err: &reqwest::Error) -> DomrelError {
        if err.is_timeout() {
            DomrelError::Timeout(self.inner.config.request_timeout_secs)
        } else if err.is_connect() {
            DomrelError::Connection(err.to_string())
        } else {
            DomrelError::Http(err.to_string())
        }
    }
}

/// URL with its query string stripped, so API keys stay out of logs
fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

/// Builder for configuring a [`DomrelClient`]
pub struct DomrelClientBuilder {
    config: ClientConfig,
}

impl Default for DomrelClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DomrelClientBuilder {
    /// Create a builder with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    /// Start from an existing configuration
    #[must_use]
    pub const fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Set the whole-request timeout in seconds
    #[must_use]
    pub const fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Set the TCP connect timeout in seconds
    #[must_use]
    pub const fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Route all traffic through a proxy
    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Set the number of redirect hops followed
    #[must_use]
    pub const fn max_redirects(mut self, hops: usize) -> Self {
        self.config.max_redirects = hops;
        self
    }

    /// Set the WhoisXML API key
    #[must_use]
    pub fn whois_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.whois.api_key = Some(key.into());
        self
    }

    /// Override the WhoisXML endpoints (useful for testing)
    #[must_use]
    pub fn whois_urls(mut self, lookup: impl Into<String>, reverse: impl Into<String>) -> Self {
        self.config.whois.lookup_url = lookup.into();
        self.config.whois.reverse_url = reverse.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<DomrelClient> {
        let http = self.http_builder()?
            .redirect(Policy::limited(self.config.max_redirects))
            .build()
            .map_err(|e| DomrelError::Config(e.to_string()))?;

        let no_redirect = self
            .http_builder()?
            .redirect(Policy::none())
            .build()
            .map_err(|e| DomrelError::Config(e.to_string()))?;

        Ok(DomrelClient {
            inner: Arc::new(ClientInner {
                http,
                no_redirect,
                config: self.config,
            }),
        })
    }

    fn http_builder(&self) -> Result<reqwest::ClientBuilder> {
        let mut builder = HttpClient::builder()
            .connect_timeout(self.config.connect_timeout())
            .timeout(self.config.request_timeout())
            .user_agent(&self.config.user_agent)
            .gzip(true);

        if let Some(proxy) = &self.config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| DomrelError::Config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        Ok(builder)
    }
}
