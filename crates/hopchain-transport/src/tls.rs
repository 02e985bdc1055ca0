//! TLS client handshake over an established stream.
//!
//! Relays in a chain typically present self-signed certificates, so the
//! default client skips verification and only uses the server name for SNI.

use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::{CertificateDer, ServerName};
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::ProxyStream;
use crate::error::TransportError;

/// TLS client wrapping any [`ProxyStream`].
#[derive(Clone)]
pub struct TlsClient {
    connector: TlsConnector,
}

impl TlsClient {
    /// Client that accepts any server certificate.
    pub fn new_insecure() -> Self {
        let config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier))
            .with_no_client_auth();
        Self::from_config(config)
    }

    /// Client using a caller-supplied rustls configuration.
    pub fn from_config(config: rustls::ClientConfig) -> Self {
        Self {
            connector: TlsConnector::from(Arc::new(config)),
        }
    }

    /// Run the client handshake on `stream`, sending `server_name` as SNI.
    ///
    /// `None` or a zero timeout waits indefinitely.
    pub async fn handshake<S: ProxyStream>(
        &self,
        stream: S,
        server_name: &str,
        timeout: Option<Duration>,
    ) -> Result<TlsStream<S>, TransportError> {
        let name = ServerName::try_from(server_name.to_string())
            .map_err(|e| TransportError::Config(format!("invalid SNI {server_name:?}: {e}")))?;

        let handshake = self.connector.connect(name, stream);
        let tls = match timeout.filter(|t| !t.is_zero()) {
            Some(limit) => tokio::time::timeout(limit, handshake).await.map_err(|_| {
                TransportError::Timeout(format!("tls handshake with {server_name}"))
            })??,
            None => handshake.await?,
        };
        Ok(tls)
    }
}

impl std::fmt::Debug for TlsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsClient").finish_non_exhaustive()
    }
}

/// A TLS certificate verifier that accepts any certificate.
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
