//! Chain file configuration.
//!
//! A chain file lists hops in order. Each hop becomes a [`NodeGroup`] whose
//! nodes are interchangeable; building the file yields a [`Chain`] and the
//! [`ChainOptions`] every dial through it should use.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hopchain_bypass::Bypass;
use hopchain_dns::{DnsConfig, DnsResolver, Hosts};
use hopchain_transport::{TcpDialer, TlsClient};
use serde::{Deserialize, Serialize};

use crate::chain::{Chain, ChainOptions};
use crate::client::{Client, Connector, Transporter};
use crate::connector::{ForwardConnector, ProtocolKind, RelayConnector};
use crate::error::ChainError;
use crate::group::{DefaultSelector, FailFilter, InvalidFilter, NodeFilter, NodeGroup, Strategy};
use crate::node::Node;
use crate::transport::{TcpTransporter, TlsTransporter, TransportKind};

/// Top-level chain file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChainConfig {
    /// Attempts per dial when the caller does not say. 0 means one.
    #[serde(default)]
    pub retries: usize,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Resolver for targets and for node addresses. Absent means targets are
    /// passed on unresolved and nodes are dialed with the system resolver.
    #[serde(default)]
    pub dns: Option<DnsConfig>,

    /// Static name → IP overrides, consulted before `dns`.
    #[serde(default)]
    pub hosts: HashMap<String, String>,

    /// Hops in dialing order. Empty means every target is dialed directly.
    #[serde(default)]
    pub hops: Vec<HopConfig>,
}

/// One hop: a group of interchangeable nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopConfig {
    #[serde(default)]
    pub strategy: Strategy,

    /// Failures before a node is skipped. 0 disables the check.
    #[serde(default = "default_max_fails")]
    pub max_fails: u32,

    /// How long a failed node stays skipped (seconds).
    #[serde(default = "default_fail_timeout")]
    pub fail_timeout_secs: u64,

    pub nodes: Vec<NodeConfig>,
}

/// A single proxy node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub name: String,

    /// Node address (host:port).
    pub addr: String,

    #[serde(default)]
    pub protocol: ProtocolKind,

    #[serde(default)]
    pub transport: TransportKind,

    /// Required for the relay protocol.
    #[serde(default)]
    pub password: Option<String>,

    /// TLS server name. Defaults to the host part of `addr`.
    #[serde(default)]
    pub sni: Option<String>,

    /// Targets that must not go through this node.
    #[serde(default)]
    pub bypass: Vec<String>,

    /// Treat `bypass` as the only targets allowed through this node.
    #[serde(default)]
    pub bypass_reversed: bool,
}

/// Timeouts in seconds. 0 means no limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Physical dial to the first hop, and direct dials.
    #[serde(default = "default_dial_timeout")]
    pub dial_timeout_secs: u64,

    /// Transport handshake with each hop.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// Connect request through each hop.
    #[serde(default = "default_dial_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            dial_timeout_secs: default_dial_timeout(),
            handshake_timeout_secs: default_handshake_timeout(),
            connect_timeout_secs: default_dial_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn dial(&self) -> Option<Duration> {
        secs(self.dial_timeout_secs)
    }

    pub fn handshake(&self) -> Option<Duration> {
        secs(self.handshake_timeout_secs)
    }

    pub fn connect(&self) -> Option<Duration> {
        secs(self.connect_timeout_secs)
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

fn default_max_fails() -> u32 {
    hopchain_core::DEFAULT_MAX_FAILS
}
fn default_fail_timeout() -> u64 {
    hopchain_core::DEFAULT_FAIL_TIMEOUT_SECS
}
fn default_dial_timeout() -> u64 {
    hopchain_core::DEFAULT_DIAL_TIMEOUT_SECS
}
fn default_handshake_timeout() -> u64 {
    hopchain_core::DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS
}

/// Read, parse and validate a chain file.
pub fn load_config(path: &Path) -> Result<ChainConfig, ChainError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ChainError::Config(format!("failed to read {}: {e}", path.display())))?;
    ChainConfig::from_toml(&text)
}

impl ChainConfig {
    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ChainError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| ChainError::Config(format!("failed to parse chain file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        for (i, hop) in self.hops.iter().enumerate() {
            if hop.nodes.is_empty() {
                return Err(ChainError::Config(format!("hop {i} has no nodes")));
            }
            for node in &hop.nodes {
                node.validate()?;
            }
        }
        Hosts::from_map(&self.hosts).map_err(|e| ChainError::Config(e.to_string()))?;
        Ok(())
    }

    /// Build the chain: one group per hop, node ids numbered from 1.
    pub fn build_chain(&self) -> Result<Chain, ChainError> {
        let tls = TlsClient::new_insecure();
        let dialer = match self.resolver()? {
            Some(resolver) => TcpDialer::new().with_resolver(resolver),
            None => TcpDialer::new(),
        };
        let mut chain = Chain::default().with_retries(self.retries);
        let mut id = 0;

        for hop in &self.hops {
            let mut nodes = Vec::with_capacity(hop.nodes.len());
            for node in &hop.nodes {
                id += 1;
                nodes.push(node.build(id, &self.timeouts, &dialer, &tls)?);
            }
            let filters: Vec<Box<dyn NodeFilter>> = vec![
                Box::new(InvalidFilter),
                Box::new(FailFilter {
                    max_fails: hop.max_fails,
                    fail_timeout: Duration::from_secs(hop.fail_timeout_secs),
                }),
            ];
            let selector = DefaultSelector::new(hop.strategy, filters);
            chain.add_node_group(NodeGroup::with_selector(nodes, Arc::new(selector)));
        }

        Ok(chain)
    }

    /// Per-dial options: retries, direct-dial timeout, hosts and resolver.
    pub fn chain_options(&self) -> Result<ChainOptions, ChainError> {
        let mut opts = ChainOptions::new().retries(self.retries);
        opts.timeout = self.timeouts.dial();
        if !self.hosts.is_empty() {
            let hosts =
                Hosts::from_map(&self.hosts).map_err(|e| ChainError::Config(e.to_string()))?;
            opts = opts.hosts(Arc::new(hosts));
        }
        if let Some(resolver) = self.resolver()? {
            opts = opts.resolver(Arc::new(resolver));
        }
        Ok(opts)
    }

    fn resolver(&self) -> Result<Option<DnsResolver>, ChainError> {
        self.dns
            .as_ref()
            .map(|dns| DnsResolver::new(dns).map_err(|e| ChainError::Config(format!("dns: {e}"))))
            .transpose()
    }
}

impl NodeConfig {
    fn validate(&self) -> Result<(), ChainError> {
        match hopchain_dns::split_host_port(&self.addr) {
            Ok((host, port)) if !host.is_empty() && port > 0 => {}
            _ => {
                return Err(ChainError::Config(format!(
                    "node address {:?} needs host:port",
                    self.addr
                )));
            }
        }
        let missing_password = self.password.as_deref().is_none_or(str::is_empty);
        if self.protocol == ProtocolKind::Relay && missing_password {
            return Err(ChainError::Config(format!("relay node {} needs a password", self.addr)));
        }
        self.bypass()?;
        Ok(())
    }

    fn bypass(&self) -> Result<Option<Bypass>, ChainError> {
        if self.bypass.is_empty() {
            return Ok(None);
        }
        Bypass::new(&self.bypass, self.bypass_reversed)
            .map(Some)
            .map_err(|e| ChainError::Config(format!("node {}: {e}", self.addr)))
    }

    fn build(
        &self,
        id: usize,
        timeouts: &TimeoutConfig,
        dialer: &TcpDialer,
        tls: &TlsClient,
    ) -> Result<Node, ChainError> {
        let connector: Arc<dyn Connector> = match self.protocol {
            ProtocolKind::Forward => Arc::new(ForwardConnector),
            ProtocolKind::Relay => {
                Arc::new(RelayConnector::new(self.password.clone().unwrap_or_default()))
            }
        };
        let transporter: Arc<dyn Transporter> = match self.transport {
            TransportKind::Tcp => Arc::new(TcpTransporter::new(dialer.clone())),
            TransportKind::Tls => Arc::new(TlsTransporter::new(dialer.clone(), tls.clone())),
        };

        let mut node = Node::new(id, self.addr.clone(), Client::from_arcs(connector, transporter))
            .with_name(self.name.clone())
            .with_protocol(self.protocol.as_str(), self.transport.as_str());
        if let Some(sni) = &self.sni {
            node = node.with_host(sni.clone());
        }
        if let Some(bypass) = self.bypass()? {
            node = node.with_bypass(bypass);
        }
        node.dial_options.timeout = timeouts.dial();
        node.handshake_options.timeout = timeouts.handshake();
        node.connect_options.timeout = timeouts.connect();
        Ok(node)
    }
}
