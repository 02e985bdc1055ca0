//! Static host-name overrides consulted before any DNS lookup.

use std::collections::HashMap;
use std::net::IpAddr;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::DnsError;

/// One hosts-file entry: an address, its canonical name and aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub ip: IpAddr,
    pub hostname: String,
    pub aliases: Vec<String>,
}

impl Host {
    pub fn new(ip: IpAddr, hostname: impl Into<String>) -> Self {
        Self {
            ip,
            hostname: hostname.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    fn matches(&self, name: &str) -> bool {
        self.hostname.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Host override table.
///
/// Safe to share across tasks; entries can be added while lookups run.
#[derive(Debug, Default)]
pub struct Hosts {
    entries: RwLock<Vec<Host>>,
}

impl Hosts {
    pub fn new(entries: Vec<Host>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Parse hosts-file text: `ip hostname [alias...]`, `#` starts a comment.
    ///
    /// Lines whose first field is not an IP address are skipped.
    pub fn parse(text: &str) -> Self {
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            let (Some(ip), Some(hostname)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Ok(ip) = ip.parse::<IpAddr>() else {
                debug!(line = %line.trim(), "skipping hosts line with invalid address");
                continue;
            };
            entries.push(Host::new(ip, hostname).with_aliases(fields.map(String::from).collect()));
        }
        Self::new(entries)
    }

    /// Build from a `hostname → ip` map, as found in configuration files.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, DnsError> {
        let mut entries = Vec::with_capacity(map.len());
        for (hostname, ip) in map {
            let ip = ip
                .parse::<IpAddr>()
                .map_err(|_| DnsError::HostsParse(format!("{hostname} = {ip}")))?;
            entries.push(Host::new(ip, hostname.clone()));
        }
        // Deterministic order for lookups of duplicated aliases.
        entries.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        Ok(Self::new(entries))
    }

    /// Append an entry. Earlier entries win on duplicate names.
    pub fn add_host(&self, host: Host) {
        self.entries.write().push(host);
    }

    /// Return the address registered for `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<IpAddr> {
        if name.is_empty() {
            return None;
        }
        self.entries
            .read()
            .iter()
            .find(|h| h.matches(name))
            .map(|h| h.ip)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_hostname_and_alias() {
        let hosts = Hosts::parse(
            "# static entries\n\
             10.0.0.1   example.com  www.example.com\n\
             ::1        localhost6   # loopback\n\
             not-an-ip  broken.example\n",
        );
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts.lookup("example.com"), Some("10.0.0.1".parse().unwrap()));
        assert_eq!(hosts.lookup("WWW.example.com"), Some("10.0.0.1".parse().unwrap()));
        assert_eq!(hosts.lookup("localhost6"), Some("::1".parse().unwrap()));
        assert_eq!(hosts.lookup("broken.example"), None);
        assert_eq!(hosts.lookup(""), None);
    }

    #[test]
    fn first_entry_wins() {
        let hosts = Hosts::default();
        hosts.add_host(Host::new("10.0.0.1".parse().unwrap(), "a.test"));
        hosts.add_host(Host::new("10.0.0.2".parse().unwrap(), "a.test"));
        assert_eq!(hosts.lookup("a.test"), Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn from_map_rejects_bad_ip() {
        let mut map = HashMap::new();
        map.insert("ok.test".to_string(), "192.0.2.1".to_string());
        assert_eq!(Hosts::from_map(&map).unwrap().len(), 1);

        map.insert("bad.test".to_string(), "999.0.0.1".to_string());
        let err = Hosts::from_map(&map).unwrap_err();
        assert!(err.to_string().contains("bad.test"));
    }
}
