//! A single proxy hop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use hopchain_bypass::Bypass;
use parking_lot::Mutex;

use crate::client::{Client, ConnectOptions, DialOptions, HandshakeOptions};
use crate::group::GroupHandle;

/// One proxy endpoint: where it is, how to talk to it, and what to skip.
///
/// A `Node` is a cheap value. Route selection hands out copies drawn from a
/// [`NodeGroup`](crate::group::NodeGroup); every copy shares the same fail
/// marker and reports liveness back to the group it came from.
#[derive(Clone)]
pub struct Node {
    /// Identity within the owning group; liveness is reported by id.
    pub id: usize,
    pub name: String,
    /// `host:port` of the node itself.
    pub addr: String,
    /// Server name presented during the transport handshake.
    pub host: String,
    pub protocol: String,
    pub transport: String,
    pub client: Client,
    pub dial_options: DialOptions,
    pub handshake_options: HandshakeOptions,
    pub connect_options: ConnectOptions,
    pub bypass: Option<Arc<Bypass>>,
    pub(crate) group: Option<GroupHandle>,
    pub(crate) marker: Arc<FailMarker>,
}

impl Node {
    pub fn new(id: usize, addr: impl Into<String>, client: Client) -> Self {
        let addr = addr.into();
        let host = host_of(&addr).to_string();
        Self {
            id,
            name: String::new(),
            handshake_options: HandshakeOptions {
                addr: addr.clone(),
                host: host.clone(),
                timeout: None,
            },
            addr,
            host,
            protocol: String::new(),
            transport: String::new(),
            client,
            dial_options: DialOptions::default(),
            connect_options: ConnectOptions::default(),
            bypass: None,
            group: None,
            marker: Arc::new(FailMarker::default()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the handshake server name (SNI).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self.handshake_options.host = self.host.clone();
        self
    }

    /// Labels used in the display form, e.g. `relay` + `tls`.
    pub fn with_protocol(
        mut self,
        protocol: impl Into<String>,
        transport: impl Into<String>,
    ) -> Self {
        self.protocol = protocol.into();
        self.transport = transport.into();
        self
    }

    pub fn with_bypass(mut self, bypass: Bypass) -> Self {
        self.bypass = Some(Arc::new(bypass));
        self
    }

    /// Whether `addr` must not be proxied through this node.
    pub fn bypasses(&self, addr: &str) -> bool {
        self.bypass.as_ref().is_some_and(|b| b.contains(addr))
    }

    /// Report a transport failure to the owning group.
    pub fn mark_dead(&self) {
        if let Some(group) = self.group.as_ref().and_then(GroupHandle::upgrade) {
            group.mark_dead_node(self.id);
        }
    }

    /// Report a successful handshake to the owning group.
    pub fn reset_dead(&self) {
        if let Some(group) = self.group.as_ref().and_then(GroupHandle::upgrade) {
            group.reset_dead_node(self.id);
        }
    }

    pub fn fail_count(&self) -> u32 {
        self.marker.fail_count()
    }

    pub fn last_failure(&self) -> Option<Instant> {
        self.marker.last_failure()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.protocol.is_empty(), self.transport.is_empty()) {
            (true, true) => f.write_str(&self.addr),
            (false, true) => write!(f, "{}://{}", self.protocol, self.addr),
            (true, false) => write!(f, "{}://{}", self.transport, self.addr),
            (false, false) => write!(f, "{}+{}://{}", self.protocol, self.transport, self.addr),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("addr", &self.addr)
            .field("protocol", &self.protocol)
            .field("transport", &self.transport)
            .field("multiplex", &self.client.multiplex())
            .field("fail_count", &self.fail_count())
            .finish_non_exhaustive()
    }
}

/// Failure bookkeeping shared by every copy of a node.
#[derive(Debug, Default)]
pub(crate) struct FailMarker {
    count: AtomicU32,
    last: Mutex<Option<Instant>>,
}

impl FailMarker {
    pub(crate) fn mark(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        *self.last.lock() = Some(Instant::now());
    }

    pub(crate) fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        *self.last.lock() = None;
    }

    pub(crate) fn fail_count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    pub(crate) fn last_failure(&self) -> Option<Instant> {
        *self.last.lock()
    }
}

/// Host part of `host:port`, without IPv6 brackets.
pub(crate) fn host_of(addr: &str) -> &str {
    match hopchain_dns::split_host_port_str(addr) {
        Some((host, _)) => host,
        None => addr,
    }
}
