//! Built-in transporters.
//!
//! Both dial plain TCP, or tunnel through the sub-route attached to
//! [`DialOptions::chain`] when route selection put one there.

mod tcp;
mod tls;

use std::io;

use hopchain_transport::{BoxStream, TcpDialer, TransportError, boxed};
use serde::{Deserialize, Serialize};

use crate::chain::ChainOptions;
use crate::client::DialOptions;

pub use tcp::TcpTransporter;
pub use tls::TlsTransporter;

/// Transport identifier, used in configuration files and relay metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    #[serde(alias = "plain")]
    Tcp,
    Tls,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Tls => "tls",
        }
    }
}

async fn dial_link(
    dialer: &TcpDialer,
    addr: &str,
    opts: &DialOptions,
) -> Result<BoxStream, TransportError> {
    match &opts.chain {
        Some(chain) => {
            let options = ChainOptions {
                timeout: opts.timeout,
                ..ChainOptions::default()
            };
            chain
                .dial(addr, &options)
                .await
                .map_err(|e| TransportError::Io(io::Error::other(e)))
        }
        None => Ok(boxed(dialer.dial(addr, opts.timeout).await?)),
    }
}
