//! Error types for the chain crate.

use hopchain_transport::TransportError;
use thiserror::Error;

/// Errors from drawing a node out of a [`NodeGroup`](crate::group::NodeGroup).
#[derive(Error, Debug)]
pub enum GroupError {
    #[error("no nodes configured")]
    NoNodes,

    #[error("none available")]
    NoneAvailable,

    #[error("selector: {0}")]
    Selector(String),
}

/// Errors from route selection and connection establishment.
///
/// Hop-specific variants carry the display form of the node that failed.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("empty chain")]
    EmptyChain,

    #[error("node selection failed: {0}")]
    Selection(#[from] GroupError),

    #[error("dial {node}: {source}")]
    Dial {
        node: String,
        #[source]
        source: TransportError,
    },

    #[error("handshake with {node}: {source}")]
    Handshake {
        node: String,
        #[source]
        source: TransportError,
    },

    #[error("connect via {node} to {addr}: {source}")]
    Connect {
        node: String,
        addr: String,
        #[source]
        source: TransportError,
    },

    #[error("direct dial {addr}: {source}")]
    DirectDial {
        addr: String,
        #[source]
        source: TransportError,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChainError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        if matches!(self.transport_source(), Some(TransportError::Timeout(_))) {
            return hopchain_core::ERROR_TIMEOUT;
        }
        match self {
            Self::EmptyChain | Self::Selection(_) => hopchain_core::ERROR_SELECT,
            Self::Dial { .. } | Self::DirectDial { .. } => hopchain_core::ERROR_DIAL,
            Self::Handshake { .. } => hopchain_core::ERROR_HANDSHAKE,
            Self::Connect { .. } => hopchain_core::ERROR_CONNECT,
            Self::Config(_) => hopchain_core::ERROR_CONFIG,
            Self::Io(_) => hopchain_core::ERROR_IO,
        }
    }

    fn transport_source(&self) -> Option<&TransportError> {
        match self {
            Self::Dial { source, .. }
            | Self::Handshake { source, .. }
            | Self::Connect { source, .. }
            | Self::DirectDial { source, .. } => Some(source),
            _ => None,
        }
    }
}
