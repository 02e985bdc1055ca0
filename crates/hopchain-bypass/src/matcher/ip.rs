//! IP and CIDR matcher.

use std::net::IpAddr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

/// Matcher for bare IP addresses and CIDR ranges.
///
/// A bare address is stored as a host-length prefix (`/32` or `/128`), so
/// both rule kinds share one containment check.
#[derive(Debug, Default)]
pub struct CidrMatcher {
    v4: Vec<Ipv4Net>,
    v6: Vec<Ipv6Net>,
}

impl CidrMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a CIDR range.
    pub fn add_net(&mut self, net: IpNet) {
        match net {
            IpNet::V4(n) => self.v4.push(n.trunc()),
            IpNet::V6(n) => self.v6.push(n.trunc()),
        }
    }

    /// Add a single address.
    pub fn add_ip(&mut self, ip: IpAddr) {
        self.add_net(IpNet::from(ip));
    }

    /// Check if an IP address is contained in any rule.
    ///
    /// IPv4-mapped IPv6 addresses are checked against the IPv4 rules.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.v4.iter().any(|n| n.contains(&v4)),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => self.v4.iter().any(|n| n.contains(&v4)),
                None => self.v6.iter().any(|n| n.contains(&v6)),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn cidr_and_single_addresses() {
        let mut m = CidrMatcher::new();
        m.add_net("10.0.0.0/8".parse().unwrap());
        m.add_ip(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)));
        m.add_net("2001:db8::/32".parse().unwrap());

        assert!(m.contains(IpAddr::V4(Ipv4Addr::new(10, 255, 0, 1))));
        assert!(m.contains(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))));
        assert!(!m.contains(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2))));
        assert!(m.contains(IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1))));
        assert!(!m.contains(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn host_bits_are_truncated() {
        let mut m = CidrMatcher::new();
        m.add_net("10.1.2.3/16".parse().unwrap());
        assert!(m.contains(IpAddr::V4(Ipv4Addr::new(10, 1, 200, 9))));
    }

    #[test]
    fn mapped_ipv6_uses_v4_rules() {
        let mut m = CidrMatcher::new();
        m.add_net("127.0.0.0/8".parse().unwrap());
        let mapped: IpAddr = "::ffff:127.0.0.1".parse().unwrap();
        assert!(m.contains(mapped));
    }

    #[test]
    fn empty_matches_nothing() {
        let m = CidrMatcher::new();
        assert!(!m.contains(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(m.is_empty());
    }
}
