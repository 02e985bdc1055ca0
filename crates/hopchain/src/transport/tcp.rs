use async_trait::async_trait;
use hopchain_transport::{BoxStream, TcpDialer, TransportError};

use crate::client::{DialOptions, HandshakeOptions, Transporter};

/// Raw TCP. The handshake is a no-op.
#[derive(Debug, Clone, Default)]
pub struct TcpTransporter {
    dialer: TcpDialer,
}

impl TcpTransporter {
    pub fn new(dialer: TcpDialer) -> Self {
        Self { dialer }
    }
}

#[async_trait]
impl Transporter for TcpTransporter {
    async fn dial(&self, addr: &str, opts: &DialOptions) -> Result<BoxStream, TransportError> {
        super::dial_link(&self.dialer, addr, opts).await
    }

    async fn handshake(
        &self,
        conn: BoxStream,
        _opts: &HandshakeOptions,
    ) -> Result<BoxStream, TransportError> {
        Ok(conn)
    }
}
