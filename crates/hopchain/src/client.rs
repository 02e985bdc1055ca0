//! Per-node protocol stack.
//!
//! A [`Client`] pairs a [`Transporter`], which owns the physical link to a
//! node, with a [`Connector`], which asks an established node to open a
//! logical stream onward to the next address.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hopchain_transport::{BoxStream, TransportError};

use crate::chain::Chain;
use crate::connector::ForwardConnector;
use crate::transport::TcpTransporter;

/// Options for establishing the physical link to a node.
#[derive(Clone, Default)]
pub struct DialOptions {
    pub timeout: Option<Duration>,
    /// Sub-route to dial through. Set during route selection for nodes
    /// whose transporter multiplexes.
    pub chain: Option<Chain>,
}

impl fmt::Debug for DialOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialOptions")
            .field("timeout", &self.timeout)
            .field("chain", &self.chain.as_ref().map(ToString::to_string))
            .finish()
    }
}

/// Options for the transport handshake with a node.
#[derive(Debug, Clone, Default)]
pub struct HandshakeOptions {
    /// Address of the node being handshaken.
    pub addr: String,
    /// Server name to present, e.g. TLS SNI.
    pub host: String,
    pub timeout: Option<Duration>,
}

/// Options for a logical connect through a node.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Address the caller originally asked for, before resolution.
    pub requested_addr: Option<String>,
    pub timeout: Option<Duration>,
}

/// Establishes and secures the physical link to a node.
#[async_trait]
pub trait Transporter: Send + Sync {
    async fn dial(&self, addr: &str, opts: &DialOptions) -> Result<BoxStream, TransportError>;

    /// Consumes the raw link; on error the link is dropped and therefore closed.
    async fn handshake(
        &self,
        conn: BoxStream,
        opts: &HandshakeOptions,
    ) -> Result<BoxStream, TransportError>;

    /// Whether many logical sessions share one physical link.
    fn multiplex(&self) -> bool {
        false
    }
}

/// Opens a logical stream through an established node.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        conn: BoxStream,
        addr: &str,
        opts: &ConnectOptions,
    ) -> Result<BoxStream, TransportError>;
}

/// Connector and transporter for one node.
#[derive(Clone)]
pub struct Client {
    connector: Arc<dyn Connector>,
    transporter: Arc<dyn Transporter>,
}

impl Client {
    pub fn new(
        connector: impl Connector + 'static,
        transporter: impl Transporter + 'static,
    ) -> Self {
        Self::from_arcs(Arc::new(connector), Arc::new(transporter))
    }

    pub fn from_arcs(connector: Arc<dyn Connector>, transporter: Arc<dyn Transporter>) -> Self {
        Self { connector, transporter }
    }

    pub async fn dial(&self, addr: &str, opts: &DialOptions) -> Result<BoxStream, TransportError> {
        self.transporter.dial(addr, opts).await
    }

    pub async fn handshake(
        &self,
        conn: BoxStream,
        opts: &HandshakeOptions,
    ) -> Result<BoxStream, TransportError> {
        self.transporter.handshake(conn, opts).await
    }

    pub async fn connect(
        &self,
        conn: BoxStream,
        addr: &str,
        opts: &ConnectOptions,
    ) -> Result<BoxStream, TransportError> {
        self.connector.connect(conn, addr, opts).await
    }

    pub fn multiplex(&self) -> bool {
        self.transporter.multiplex()
    }
}

/// Plain TCP with a pass-through connector.
impl Default for Client {
    fn default() -> Self {
        Self::new(ForwardConnector, TcpTransporter::default())
    }
}
