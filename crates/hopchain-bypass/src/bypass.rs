//! Per-node bypass rule set.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::BypassError;
use crate::matcher::{CidrMatcher, DomainMatcher, WildcardMatcher};

/// A set of address patterns that exempt targets from proxying through a node.
///
/// Pattern forms:
/// - `192.0.2.1`, `2001:db8::1`: single address
/// - `10.0.0.0/8`: CIDR range
/// - `example.com`: exact domain
/// - `.example.com`: the domain and all its subdomains
/// - `*.example.com`, `10.0.0.*`: glob, checked against the raw host string
///
/// With `reversed` set the rule set becomes a whitelist: everything that does
/// *not* match is bypassed. An empty rule set never bypasses, reversed or not.
#[derive(Debug, Default)]
pub struct Bypass {
    ips: CidrMatcher,
    domains: DomainMatcher,
    wildcards: Option<WildcardMatcher>,
    reversed: bool,
}

impl Bypass {
    /// Build a rule set from patterns. Blank patterns are ignored.
    pub fn new<I, S>(patterns: I, reversed: bool) -> Result<Self, BypassError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ips = CidrMatcher::new();
        let mut domains = DomainMatcher::new();
        let mut globs = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            if let Ok(ip) = pattern.parse::<IpAddr>() {
                ips.add_ip(ip);
            } else if pattern.contains('/') {
                let net = pattern
                    .parse::<IpNet>()
                    .map_err(|e| BypassError::InvalidPattern(format!("{pattern}: {e}")))?;
                ips.add_net(net);
            } else if pattern.contains(['*', '?']) {
                globs.push(pattern.to_string());
            } else if pattern.starts_with('.') {
                domains.add_suffix(pattern);
            } else {
                domains.add_exact(pattern);
            }
        }

        Ok(Self {
            ips,
            domains,
            wildcards: WildcardMatcher::new(globs)?,
            reversed,
        })
    }

    /// Whether `addr` (a host, or `host:port`) should skip this node.
    pub fn contains(&self, addr: &str) -> bool {
        if addr.is_empty() || self.is_empty() {
            return false;
        }
        let matched = self.matches_host(strip_port(addr));
        matched != self.reversed
    }

    fn matches_host(&self, host: &str) -> bool {
        if let Ok(ip) = host.parse::<IpAddr>()
            && self.ips.contains(ip)
        {
            return true;
        }
        if self.domains.matches(host) {
            return true;
        }
        self.wildcards.as_ref().is_some_and(|w| w.matches(host))
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.ips.len() + self.domains.len() + self.wildcards.as_ref().map_or(0, |w| w.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop a valid, non-zero port; anything else is treated as a bare host.
fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, tail)) if tail.is_empty() || valid_port(tail.strip_prefix(':')) => host,
            _ => addr,
        };
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.contains(':') && valid_port(Some(port)) => {
            host
        }
        _ => addr,
    }
}

fn valid_port(port: Option<&str>) -> bool {
    port.and_then(|p| p.parse::<u16>().ok()).is_some_and(|p| p > 0)
}
