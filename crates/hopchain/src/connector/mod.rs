//! Built-in connectors.

pub mod relay;

use async_trait::async_trait;
use hopchain_transport::{BoxStream, TransportError};
use serde::{Deserialize, Serialize};

use crate::client::{ConnectOptions, Connector};

pub use relay::RelayConnector;

/// Connector identifier, used in configuration files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    /// The node forwards its link verbatim to a fixed destination.
    #[default]
    Forward,
    /// The node reads a relay handshake naming the next address.
    Relay,
}

impl ProtocolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolKind::Forward => "forward",
            ProtocolKind::Relay => "relay",
        }
    }
}

/// Returns the link unchanged; the node decides where traffic goes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardConnector;

#[async_trait]
impl Connector for ForwardConnector {
    async fn connect(
        &self,
        conn: BoxStream,
        _addr: &str,
        _opts: &ConnectOptions,
    ) -> Result<BoxStream, TransportError> {
        Ok(conn)
    }
}
