//! Certificate SAN probe.
//!
//! Connects to `<domain>:443`, accepts whatever certificate is served and
//! reads the leaf certificate's DNS SANs and subject organisations. The
//! certificate is never validated: expired or self-signed certificates still
//! name related domains.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use domrel_client::ClientConfig;
use domrel_core::merge::merge_keys;
use domrel_core::{Canonicalize, DiscoveryMethod, Domain};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};
use x509_parser::extensions::GeneralName;

use crate::error::{ReconError, ReconResult};

/// Names read from a leaf certificate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateNames {
    /// DNS entries of the Subject Alternative Name extension
    pub dns_names: Vec<String>,
    /// Subject organisation attributes
    pub organizations: Vec<String>,
}

/// Source of served certificates
#[async_trait]
pub trait CertSource: Send + Sync {
    /// Names on the leaf certificate served for `host`
    async fn peer_certificate(&self, host: &str) -> ReconResult<CertificateNames>;
}

/// Accepts any server certificate; signatures are still checked so the
/// handshake itself is well formed.
#[derive(Debug)]
struct AcceptAnyCert {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

/// Live TLS dial with tokio-rustls
pub struct TlsCertSource {
    connector: TlsConnector,
    dial_timeout: Duration,
    handshake_timeout: Duration,
    port: u16,
}

impl TlsCertSource {
    /// TCP dial timeout
    pub const DIAL_TIMEOUT: Duration = Duration::from_secs(3);

    /// Source dialing port 443 with the given handshake timeout
    pub fn new(handshake_timeout: Duration) -> ReconResult<Self> {
        let provider = Arc::new(ring::default_provider());
        let verifier = AcceptAnyCert {
            algorithms: provider.signature_verification_algorithms,
        };

        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| ReconError::Tls(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            dial_timeout: Self::DIAL_TIMEOUT,
            handshake_timeout,
            port: 443,
        })
    }

    /// Source using the client's handshake timeout
    pub fn from_config(config: &ClientConfig) -> ReconResult<Self> {
        Self::new(config.tls_handshake_timeout())
    }

    /// Dial a different port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

#[async_trait]
impl CertSource for TlsCertSource {
    async fn peer_certificate(&self, host: &str) -> ReconResult<CertificateNames> {
        debug!(host, port = self.port, "TLS dial");

        let tcp = tokio::time::timeout(self.dial_timeout, TcpStream::connect((host, self.port)))
            .await
            .map_err(|_| ReconError::Timeout(self.dial_timeout.as_secs()))??;

        let server_name =
            ServerName::try_from(host.to_string()).map_err(|e| ReconError::Tls(e.to_string()))?;

        let tls = tokio::time::timeout(self.handshake_timeout, self.connector.connect(server_name, tcp))
            .await
            .map_err(|_| ReconError::Timeout(self.handshake_timeout.as_secs()))?
            .map_err(|e| ReconError::Tls(e.to_string()))?;

        let leaf = tls
            .get_ref()
            .1
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or_else(|| ReconError::Tls(format!("{host} served no certificate")))?;

        certificate_names(leaf.as_ref())
    }
}

/// Decode SAN DNS names and subject organisations from a DER certificate
pub fn certificate_names(der: &[u8]) -> ReconResult<CertificateNames> {
    let (_, cert) =
        x509_parser::parse_x509_certificate(der).map_err(|e| ReconError::Tls(e.to_string()))?;

    let dns_names = cert
        .subject_alternative_name()
        .map_err(|e| ReconError::Tls(e.to_string()))?
        .map(|san| {
            san.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let organizations = cert
        .subject()
        .iter_organization()
        .filter_map(|attr| attr.as_str().ok())
        .map(str::to_string)
        .collect();

    Ok(CertificateNames {
        dns_names,
        organizations,
    })
}

/// Read the served certificate and fold its SANs into `domain`.
///
/// Wildcard SANs count for their base name. Subject organisations replace
/// the previous list.
pub async fn probe_cert_sans(
    domain: &mut Domain,
    source: &dyn CertSource,
    canonicalizer: &dyn Canonicalize,
) -> ReconResult<()> {
    let names = source.peer_certificate(domain.name()).await?;

    let mut keys = Vec::with_capacity(names.dns_names.len());
    for san in &names.dns_names {
        let base = san.trim_start_matches("*.");
        match canonicalizer.canonicalize(base) {
            Ok(canonical) => keys.push(canonical.domain),
            Err(e) => warn!(san = %san, error = %e, "dropping certificate SAN"),
        }
    }

    debug!(domain = %domain, sans = names.dns_names.len(), "certificate read");

    let prior = std::mem::take(&mut domain.cert_sans);
    domain.cert_sans = merge_keys(domain.name(), DiscoveryMethod::CertSan, prior, keys, Utc::now());
    domain.cert_org_names = names.organizations;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::tests::suffixes;

    const FIXTURE: &[u8] = include_bytes!("../tests/fixtures/san_cert.pem");

    fn fixture_der() -> Vec<u8> {
        let (_, pem) = x509_parser::pem::parse_x509_pem(FIXTURE).unwrap();
        pem.contents
    }

    struct FixtureCert;

    #[async_trait]
    impl CertSource for FixtureCert {
        async fn peer_certificate(&self, _host: &str) -> ReconResult<CertificateNames> {
            certificate_names(&fixture_der())
        }
    }

    #[test]
    fn decodes_sans_and_organisation() {
        let names = certificate_names(&fixture_der()).unwrap();
        assert_eq!(
            names.dns_names,
            ["example.com", "www.example.com", "example.net", "*.cdn-example.org"]
        );
        assert_eq!(names.organizations, ["Example Inc"]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(certificate_names(b"not a cert"), Err(ReconError::Tls(_))));
    }

    #[tokio::test]
    async fn probe_merges_related_sans_only() {
        let mut domain = Domain::new("example.com", &suffixes()).unwrap();
        probe_cert_sans(&mut domain, &FixtureCert, &suffixes())
            .await
            .unwrap();

        let keys: Vec<_> = domain.cert_sans.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["cdn-example.org", "example.net"]);
        assert_eq!(domain.cert_org_names, ["Example Inc"]);
    }

    #[tokio::test]
    async fn rerun_keeps_created_at() {
        let mut domain = Domain::new("example.com", &suffixes()).unwrap();
        probe_cert_sans(&mut domain, &FixtureCert, &suffixes())
            .await
            .unwrap();
        let first = domain.cert_sans.clone();

        probe_cert_sans(&mut domain, &FixtureCert, &suffixes())
            .await
            .unwrap();

        for (before, after) in first.iter().zip(&domain.cert_sans) {
            assert_eq!(before.key, after.key);
            assert_eq!(before.created_at, after.created_at);
            assert!(after.updated_at >= before.updated_at);
        }
    }

    #[test]
    fn builds_tls_source() {
        let source = TlsCertSource::from_config(&ClientConfig::default())
            .unwrap()
            .with_port(8443);
        assert_eq!(source.port, 8443);
        assert_eq!(source.handshake_timeout, Duration::from_secs(5));
    }
}
