//! `host:port` helpers shared by the resolver and the chain.

use std::net::IpAddr;

use crate::error::DnsError;

/// Split `"host:port"` into (host, numeric port).
///
/// Handles IPv6 bracket notation: `"[::1]:443"` → `("::1", 443)`.
pub fn split_host_port(addr: &str) -> Result<(&str, u16), DnsError> {
    let (host, port) = split_host_port_str(addr)
        .ok_or_else(|| DnsError::InvalidAddress(format!("missing port in address: {addr}")))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| DnsError::InvalidAddress(addr.to_string()))?;
    Ok((host, port))
}

/// Split `"host:port"` without interpreting the port.
///
/// Returns `None` when there is no port separator, when an unbracketed host
/// contains a colon, or when the brackets are malformed.
pub fn split_host_port_str(addr: &str) -> Option<(&str, &str)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return Some((host, port));
    }

    let (host, port) = addr.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}

/// Join a host and port, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Join an IP address and port.
pub fn join_ip_port(ip: IpAddr, port: &str) -> String {
    join_host_port(&ip.to_string(), port)
}
