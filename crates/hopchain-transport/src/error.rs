//! Error types for the transport crate.

use thiserror::Error;

/// Errors that can occur in transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("dns error: {0}")]
    Dns(#[from] hopchain_dns::DnsError),
}

impl TransportError {
    /// Build an error from any message, for connectors reporting protocol failures.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into()))
    }
}
