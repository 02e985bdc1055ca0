use async_trait::async_trait;
use hopchain_transport::{BoxStream, TcpDialer, TlsClient, TransportError, boxed};

use crate::client::{DialOptions, HandshakeOptions, Transporter};
use crate::node::host_of;

/// TCP followed by a TLS client handshake.
///
/// SNI is [`HandshakeOptions::host`], falling back to the host part of the
/// node address.
#[derive(Debug, Clone)]
pub struct TlsTransporter {
    dialer: TcpDialer,
    tls: TlsClient,
}

impl TlsTransporter {
    pub fn new(dialer: TcpDialer, tls: TlsClient) -> Self {
        Self { dialer, tls }
    }
}

impl Default for TlsTransporter {
    fn default() -> Self {
        Self::new(TcpDialer::default(), TlsClient::new_insecure())
    }
}

#[async_trait]
impl Transporter for TlsTransporter {
    async fn dial(&self, addr: &str, opts: &DialOptions) -> Result<BoxStream, TransportError> {
        super::dial_link(&self.dialer, addr, opts).await
    }

    async fn handshake(
        &self,
        conn: BoxStream,
        opts: &HandshakeOptions,
    ) -> Result<BoxStream, TransportError> {
        let server_name = if opts.host.is_empty() {
            host_of(&opts.addr)
        } else {
            opts.host.as_str()
        };
        let stream = self.tls.handshake(conn, server_name, opts.timeout).await?;
        Ok(boxed(stream))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use rcgen::{CertificateParams, KeyPair, PKCS_ECDSA_P256_SHA256};
    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
    use tokio_rustls::TlsAcceptor;

    fn acceptor() -> TlsAcceptor {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
        let cert = CertificateParams::new(vec!["relay.test".to_string(), "cdn.test".to_string()])
            .unwrap()
            .self_signed(&key_pair)
            .unwrap();
        let der = cert.der().clone();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
        let config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![der], key)
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }

    #[tokio::test]
    async fn handshake_uses_addr_host_as_sni() {
        let (client, server) = duplex(16 * 1024);
        let acceptor = acceptor();
        let server = tokio::spawn(async move {
            let mut tls = acceptor.accept(server).await.unwrap();
            let sni = tls.get_ref().1.server_name().map(str::to_string);
            let mut buf = [0u8; 5];
            tls.read_exact(&mut buf).await.unwrap();
            (sni, buf)
        });

        let opts = HandshakeOptions {
            addr: "relay.test:443".into(),
            ..HandshakeOptions::default()
        };
        let mut conn = TlsTransporter::default().handshake(boxed(client), &opts).await.unwrap();
        conn.write_all(b"hello").await.unwrap();
        conn.flush().await.unwrap();

        let (sni, buf) = server.await.unwrap();
        assert_eq!(sni.as_deref(), Some("relay.test"));
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn host_overrides_sni() {
        let (client, server) = duplex(16 * 1024);
        let acceptor = acceptor();
        let server = tokio::spawn(async move {
            let tls = acceptor.accept(server).await.unwrap();
            tls.get_ref().1.server_name().map(str::to_string)
        });

        let opts = HandshakeOptions {
            addr: "10.0.0.1:443".into(),
            host: "cdn.test".into(),
            timeout: None,
        };
        let _conn = TlsTransporter::default().handshake(boxed(client), &opts).await.unwrap();
        assert_eq!(server.await.unwrap().as_deref(), Some("cdn.test"));
    }
}
