//! Stream-level transport primitives for hopchain.
//!
//! Every hop of a chain hands the next hop an opaque, owned byte stream.
//! This crate defines that stream type and the two ways the built-in
//! transporters produce one:
//!
//! - [`plain`]: TCP dialing with an optional timeout and resolver.
//! - [`tls`]: TLS client handshake over any existing stream.

pub mod error;
pub mod plain;
pub mod tls;

use tokio::io::{AsyncRead, AsyncWrite};

pub use error::TransportError;
pub use plain::TcpDialer;
pub use tls::TlsClient;

/// Marker trait for streams that can be carried through a chain.
pub trait ProxyStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> ProxyStream for T {}

/// Owned, type-erased stream passed between hops.
///
/// Dropping it closes every layer underneath.
pub type BoxStream = Box<dyn ProxyStream>;

/// Erase a concrete stream type.
pub fn boxed<S: ProxyStream>(stream: S) -> BoxStream {
    Box::new(stream)
}
