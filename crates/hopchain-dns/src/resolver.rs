//! Async DNS resolver backed by hickory-resolver.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::xfer::Protocol;
use hickory_resolver::Resolver as HickoryResolver;
use hickory_resolver::config::{
    NameServerConfig, NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use hickory_resolver::name_server::TokioConnectionProvider;
use tracing::debug;

use crate::addr::split_host_port;
use crate::config::{DnsConfig, DnsStrategy};
use crate::error::DnsError;

/// Name-to-address lookup consulted before dialing a target.
///
/// Implementations must be thread-safe (`Send + Sync`) as a single resolver
/// is shared by every dial on a chain.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve a bare host name to its addresses, best candidate first.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError>;
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    #[inline]
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        (**self).resolve(host).await
    }
}

/// Shared async DNS resolver.
///
/// Wraps `hickory_resolver::Resolver` with:
/// - Built-in async caching with TTL
/// - Configurable nameservers (UDP/TCP/DoH/DoT)
/// - `prefer_ipv4` support
///
/// Thread-safe and cheaply cloneable (wraps `Arc` internally).
#[derive(Clone)]
pub struct DnsResolver {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: HickoryResolver<TokioConnectionProvider>,
    prefer_ipv4: bool,
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver")
            .field("prefer_ipv4", &self.inner.prefer_ipv4)
            .finish()
    }
}

impl DnsResolver {
    /// Build a resolver from configuration.
    ///
    /// Call once at startup and share via `Clone`.
    pub fn new(config: &DnsConfig) -> Result<Self, DnsError> {
        let resolver = match config.strategy {
            DnsStrategy::System => {
                let mut builder = HickoryResolver::builder_tokio()
                    .map_err(|e| DnsError::InvalidServer(format!("system config: {e}")))?;
                let opts = builder.options_mut();
                opts.cache_size = config.cache_size;
                opts.preserve_intermediates = true;
                builder.build()
            }
            DnsStrategy::Custom => {
                let name_servers = parse_server_urls(&config.servers)?;
                let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
                let mut opts = ResolverOpts::default();
                opts.cache_size = config.cache_size;
                opts.preserve_intermediates = true;
                let mut builder = HickoryResolver::builder_with_config(
                    resolver_config,
                    TokioConnectionProvider::default(),
                );
                *builder.options_mut() = opts;
                builder.build()
            }
        };

        Ok(Self {
            inner: Arc::new(Inner {
                resolver,
                prefer_ipv4: config.prefer_ipv4,
            }),
        })
    }

    /// Look up all addresses of `host`, ordered by the `prefer_ipv4` policy.
    ///
    /// IP literals are returned as-is without a DNS query.
    pub async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let response = self.inner.resolver.lookup_ip(host).await?;
        let mut ips: Vec<IpAddr> = response.iter().collect();
        if self.inner.prefer_ipv4 {
            // Stable: keeps the server's order within each family.
            ips.sort_by_key(|ip| !ip.is_ipv4());
        }

        if ips.is_empty() {
            return Err(DnsError::NoResults(host.to_string()));
        }
        debug!(host = %host, resolved = ?ips, "dns resolved");
        Ok(ips)
    }

    /// Resolve `"host:port"` to a `SocketAddr`.
    ///
    /// If the host part is already an IP address, parses directly without
    /// performing a DNS query.
    pub async fn resolve_socket_addr(&self, addr: &str) -> Result<SocketAddr, DnsError> {
        // Fast path: already a SocketAddr
        if let Ok(sa) = addr.parse::<SocketAddr>() {
            return Ok(sa);
        }

        let (host, port) = split_host_port(addr)?;
        let ips = self.lookup(host).await?;
        match ips.first() {
            Some(ip) => Ok(SocketAddr::new(*ip, port)),
            None => Err(DnsError::NoResults(addr.to_string())),
        }
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        self.lookup(host).await
    }
}

/// Wire protocol of a configured nameserver, derived from its URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Udp,
    Tcp,
    Tls,
    Https,
}

impl Scheme {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "udp" => Some(Self::Udp),
            "tcp" => Some(Self::Tcp),
            "tls" => Some(Self::Tls),
            "https" => Some(Self::Https),
            _ => None,
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Self::Udp | Self::Tcp => 53,
            Self::Tls => 853,
            Self::Https => 443,
        }
    }

    fn protocol(self) -> Protocol {
        match self {
            Self::Udp => Protocol::Udp,
            Self::Tcp => Protocol::Tcp,
            Self::Tls => Protocol::Tls,
            Self::Https => Protocol::Https,
        }
    }
}

/// Parse nameserver URLs (`udp://`, `tcp://`, `tls://`, `https://`) into a
/// hickory `NameServerConfigGroup`.
fn parse_server_urls(urls: &[String]) -> Result<NameServerConfigGroup, DnsError> {
    let mut configs = Vec::with_capacity(urls.len());

    for url in urls {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| DnsError::InvalidServer(format!("missing scheme: {url}")))?;
        let scheme = Scheme::parse(scheme)
            .ok_or_else(|| DnsError::InvalidServer(format!("unsupported protocol: {scheme}")))?;

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, Some(format!("/{path}"))),
            None => (rest, None),
        };
        if path.is_some() && scheme != Scheme::Https {
            return Err(DnsError::InvalidServer(format!(
                "unexpected path in server url: {url}"
            )));
        }

        let (host, port) = parse_host_port(authority, scheme.default_port())?;
        let socket_addr = resolve_server_addr(host, port)?;
        let named = matches!(scheme, Scheme::Tls | Scheme::Https);

        configs.push(NameServerConfig {
            socket_addr,
            protocol: scheme.protocol(),
            tls_dns_name: named.then(|| host.to_string()),
            http_endpoint: (scheme == Scheme::Https)
                .then(|| path.unwrap_or_else(|| "/dns-query".to_string())),
            trust_negative_responses: false,
            bind_addr: None,
        });
    }

    if configs.is_empty() {
        return Err(DnsError::InvalidServer(
            "no dns servers configured".to_string(),
        ));
    }

    Ok(NameServerConfigGroup::from(configs))
}

/// Parse `host`, `host:port` or `[ipv6]:port`, falling back to `default_port`.
fn parse_host_port(s: &str, default_port: u16) -> Result<(&str, u16), DnsError> {
    let invalid = || DnsError::InvalidServer(format!("invalid server address: {s}"));

    let (host, port) = if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
        match tail {
            "" => (host, None),
            tail => (host, Some(tail.strip_prefix(':').ok_or_else(invalid)?)),
        }
    } else {
        match s.rsplit_once(':') {
            // Raw IPv6 literals must be bracketed.
            Some((host, _)) if host.contains(':') => return Err(invalid()),
            Some((host, port)) => (host, Some(port)),
            None => (s, None),
        }
    };

    if host.is_empty() {
        return Err(invalid());
    }
    let port = match port {
        Some(p) => p.parse::<u16>().map_err(|_| invalid())?,
        None => default_port,
    };
    Ok((host, port))
}

/// Resolve a nameserver host once at startup via the system resolver.
fn resolve_server_addr(host: &str, port: u16) -> Result<SocketAddr, DnsError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            DnsError::InvalidServer(format!("failed to resolve dns server '{host}': {e}"))
        })?
        .next()
        .ok_or_else(|| DnsError::InvalidServer(format!("dns server host has no addresses: {host}")))
}
