//! Relay connect request: encode and decode.
//!
//! Wire format, each line terminated by CRLF:
//! ```text
//! hex(SHA224(password))   56 bytes
//! host:port               up to 260 bytes
//! key=value,key=value     up to 512 bytes, may be empty
//! ```
//!
//! Recognised metadata keys are `transport` (`plain` or `tls`) and `sni`.
//! Unknown keys are ignored. After the request the stream carries payload
//! for the named address.

use async_trait::async_trait;
use hopchain_core::{HASH_LEN, MAX_METADATA_LEN, MAX_TARGET_LEN};
use hopchain_transport::{BoxStream, TransportError};
use sha2::{Digest, Sha224};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::client::{ConnectOptions, Connector};
use crate::transport::TransportKind;

const CRLF: &[u8; 2] = b"\r\n";

/// SHA-224 of `password`, hex encoded.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha224::digest(password.as_bytes()))
}

/// Hints for the relay's own outbound connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayMetadata {
    pub transport: Option<TransportKind>,
    pub sni: Option<String>,
}

impl RelayMetadata {
    fn encode(&self) -> String {
        let mut parts = Vec::new();
        if let Some(transport) = self.transport {
            let value = match transport {
                TransportKind::Tcp => "plain",
                TransportKind::Tls => "tls",
            };
            parts.push(format!("transport={value}"));
        }
        if let Some(sni) = &self.sni {
            parts.push(format!("sni={sni}"));
        }
        parts.join(",")
    }

    fn parse(line: &str) -> Self {
        let mut meta = Self::default();
        for (key, value) in line.split(',').filter_map(|part| part.split_once('=')) {
            match key.trim() {
                "transport" => {
                    meta.transport = match value.trim() {
                        "plain" | "tcp" => Some(TransportKind::Tcp),
                        "tls" => Some(TransportKind::Tls),
                        _ => None,
                    }
                }
                "sni" => meta.sni = Some(value.trim().to_string()),
                _ => {}
            }
        }
        meta
    }
}

/// A decoded connect request.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub hash: String,
    pub target: String,
    pub metadata: RelayMetadata,
}

impl RelayRequest {
    pub fn verify(&self, password: &str) -> bool {
        self.hash == hash_password(password)
    }
}

pub async fn write_request<W>(
    writer: &mut W,
    password: &str,
    target: &str,
    metadata: &RelayMetadata,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if target.is_empty() || target.len() > MAX_TARGET_LEN {
        return Err(TransportError::protocol(format!("invalid target length {}", target.len())));
    }
    let meta = metadata.encode();
    if meta.len() > MAX_METADATA_LEN {
        return Err(TransportError::protocol("metadata too long"));
    }

    let mut buf = Vec::with_capacity(HASH_LEN + target.len() + meta.len() + 3 * CRLF.len());
    buf.extend_from_slice(hash_password(password).as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(target.as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(meta.as_bytes());
    buf.extend_from_slice(CRLF);

    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Server side of the exchange, used by relays and tests.
pub async fn read_request<R>(reader: &mut R) -> Result<RelayRequest, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut hash = [0u8; HASH_LEN];
    reader.read_exact(&mut hash).await?;
    if !hash.iter().all(u8::is_ascii_hexdigit) {
        return Err(TransportError::protocol("invalid hash characters"));
    }

    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf).await?;
    if &crlf != CRLF {
        return Err(TransportError::protocol("expected CRLF after hash"));
    }

    let target = read_line(reader, MAX_TARGET_LEN, "target").await?;
    if target.is_empty() {
        return Err(TransportError::protocol("empty target address"));
    }
    let metadata = RelayMetadata::parse(&read_line(reader, MAX_METADATA_LEN, "metadata").await?);

    Ok(RelayRequest {
        // ASCII hex digits were checked above.
        hash: hash.iter().map(|&b| char::from(b)).collect(),
        target,
        metadata,
    })
}

async fn read_line<R>(reader: &mut R, max_len: usize, field: &str) -> Result<String, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(64);
    loop {
        match reader.read_u8().await? {
            b'\r' => {
                if reader.read_u8().await? != b'\n' {
                    return Err(TransportError::protocol(format!(
                        "expected LF after CR in {field}"
                    )));
                }
                break;
            }
            byte => buf.push(byte),
        }
        if buf.len() > max_len {
            return Err(TransportError::protocol(format!("{field} too long")));
        }
    }
    String::from_utf8(buf)
        .map_err(|_| TransportError::protocol(format!("invalid {field} encoding")))
}

/// Asks a relay node to open a stream to the next address.
#[derive(Clone)]
pub struct RelayConnector {
    password: String,
    metadata: RelayMetadata,
}

impl RelayConnector {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            metadata: RelayMetadata {
                transport: Some(TransportKind::Tcp),
                sni: None,
            },
        }
    }

    pub fn with_metadata(mut self, metadata: RelayMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl std::fmt::Debug for RelayConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConnector")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for RelayConnector {
    async fn connect(
        &self,
        mut conn: BoxStream,
        addr: &str,
        opts: &ConnectOptions,
    ) -> Result<BoxStream, TransportError> {
        let request = write_request(&mut conn, &self.password, addr, &self.metadata);
        match opts.timeout.filter(|t| !t.is_zero()) {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| TransportError::Timeout(format!("relay connect to {addr}")))??,
            None => request.await?,
        }
        debug!(target_addr = %addr, requested = ?opts.requested_addr, "relay request sent");
        Ok(conn)
    }
}
