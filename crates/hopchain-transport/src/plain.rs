//! Plain TCP dialing.

use std::time::Duration;

use hopchain_dns::DnsResolver;
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::TransportError;

/// Opens TCP connections, optionally bounded by a timeout.
///
/// When a [`DnsResolver`] is configured, domain names are resolved through
/// it before connecting. Without one, Tokio's built-in system resolution is
/// used.
#[derive(Debug, Clone, Default)]
pub struct TcpDialer {
    resolver: Option<DnsResolver>,
}

impl TcpDialer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(mut self, resolver: DnsResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Connect to `host:port`. `None` or a zero timeout waits indefinitely.
    pub async fn dial(
        &self,
        addr: &str,
        timeout: Option<Duration>,
    ) -> Result<TcpStream, TransportError> {
        match timeout.filter(|t| !t.is_zero()) {
            Some(limit) => tokio::time::timeout(limit, self.connect(addr))
                .await
                .map_err(|_| TransportError::Timeout(format!("connect to {addr}")))?,
            None => self.connect(addr).await,
        }
    }

    async fn connect(&self, addr: &str) -> Result<TcpStream, TransportError> {
        let tcp = match &self.resolver {
            Some(resolver) => TcpStream::connect(resolver.resolve_socket_addr(addr).await?).await?,
            None => TcpStream::connect(addr).await?,
        };
        tcp.set_nodelay(hopchain_core::DEFAULT_TCP_NO_DELAY)?;
        debug!(addr = %addr, "tcp connected");
        Ok(tcp)
    }
}
