//! Proxy chains and routes.
//!
//! A [`Chain`] is an ordered list of [`NodeGroup`]s. Every connection attempt
//! first selects a *route*: one concrete node per group, drawn in order.
//! Selection stops early when a node's bypass matches the target, and folds
//! the route built so far into a multiplexing node's dial options so that
//! node dials through it.
//!
//! The route is then walked hop by hop: dial and handshake the first node,
//! ask each node to connect onward to the next one and handshake that, and
//! finally ask the last node to connect to the (resolved) target. Failures
//! are reported to the group each node came from so later selections avoid
//! it; successful handshakes clear that record.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hopchain_dns::{Hosts, Resolver, join_ip_port, split_host_port_str};
use hopchain_transport::{BoxStream, TcpDialer, boxed};
use tracing::{debug, warn};

use crate::client::ConnectOptions;
use crate::error::ChainError;
use crate::group::NodeGroup;
use crate::node::Node;

/// Per-call knobs for [`Chain::dial`] and [`Chain::conn`].
#[derive(Clone, Default)]
pub struct ChainOptions {
    /// Attempt count; zero defers to [`Chain::retries`].
    pub retries: usize,
    /// Bound on the direct dial used when the route is empty.
    pub timeout: Option<Duration>,
    /// Static name table, consulted before `resolver`.
    pub hosts: Option<Arc<Hosts>>,
    /// Fallback name lookup after `hosts`.
    pub resolver: Option<Arc<dyn Resolver>>,
}

impl ChainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn hosts(mut self, hosts: Arc<Hosts>) -> Self {
        self.hosts = Some(hosts);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

impl fmt::Debug for ChainOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainOptions")
            .field("retries", &self.retries)
            .field("timeout", &self.timeout)
            .field("hosts", &self.hosts.as_ref().map(|h| h.len()))
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// An ordered sequence of node groups.
///
/// The default value is the empty chain, which dials targets directly.
/// Cloning shares the underlying groups.
#[derive(Clone, Default)]
pub struct Chain {
    groups: Vec<NodeGroup>,
    is_route: bool,
    /// Attempt count used when the caller's options leave it at zero.
    pub retries: usize,
}

impl Chain {
    /// One single-node group per node, in order.
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut chain = Self::default();
        for node in nodes {
            chain.add_node(node);
        }
        chain
    }

    pub fn from_groups(groups: impl IntoIterator<Item = NodeGroup>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
            ..Self::default()
        }
    }

    fn new_route() -> Self {
        Self {
            is_route: true,
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Append a single-node group.
    pub fn add_node(&mut self, node: Node) {
        self.groups.push(NodeGroup::new(vec![node]));
    }

    pub fn add_node_group(&mut self, group: NodeGroup) {
        self.groups.push(group);
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether this chain is a selected route rather than a configured chain.
    pub fn is_route(&self) -> bool {
        self.is_route
    }

    /// The first node of each group.
    pub fn nodes(&self) -> Vec<Node> {
        self.groups.iter().filter_map(|g| g.get_node(0)).collect()
    }

    pub fn node_groups(&self) -> &[NodeGroup] {
        &self.groups
    }

    pub fn last_node(&self) -> Option<Node> {
        self.groups.last().and_then(|g| g.get_node(0))
    }

    pub fn last_node_group(&self) -> Option<&NodeGroup> {
        self.groups.last()
    }

    /// Connect to `addr` through the chain, retrying whole attempts.
    pub async fn dial(&self, addr: &str, opts: &ChainOptions) -> Result<BoxStream, ChainError> {
        let attempts = self.attempts(opts);
        let mut attempt = 1;
        loop {
            match self.dial_with_options(addr, opts).await {
                Ok(conn) => return Ok(conn),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    debug!(
                        attempt,
                        attempts,
                        addr,
                        error = %e,
                        kind = e.kind(),
                        "dial attempt failed"
                    );
                    attempt += 1;
                }
            }
        }
    }

    /// Connect to the last node of a freshly selected route, without asking it
    /// to go anywhere.
    pub async fn conn(&self, opts: &ChainOptions) -> Result<BoxStream, ChainError> {
        let attempts = self.attempts(opts);
        let mut attempt = 1;
        loop {
            let result = match self.select_route() {
                Ok(route) => route.get_conn().await,
                Err(e) => Err(e),
            };
            match result {
                Ok(conn) => return Ok(conn),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    debug!(attempt, attempts, error = %e, kind = e.kind(), "conn attempt failed");
                    attempt += 1;
                }
            }
        }
    }

    /// Select a route without bypass checks.
    pub fn select_route(&self) -> Result<Chain, ChainError> {
        self.build_route(None)
    }

    /// Select a route for `addr`. An empty route means dial directly.
    pub fn select_route_for(&self, addr: &str) -> Result<Chain, ChainError> {
        self.build_route(Some(addr))
    }

    fn build_route(&self, target: Option<&str>) -> Result<Chain, ChainError> {
        if self.is_empty() || self.is_route {
            return Ok(self.clone());
        }

        let mut path = Vec::with_capacity(self.groups.len() + 1);
        let mut route = Chain::new_route();
        for group in &self.groups {
            let mut node = group.next()?;

            if let Some(addr) = target
                && node.bypasses(addr)
            {
                debug!("[bypass]{node} -> {addr}");
                return Ok(Chain::new_route());
            }

            path.push(node.to_string());
            if node.client.multiplex() {
                node.dial_options.chain = Some(std::mem::replace(&mut route, Chain::new_route()));
            }
            route.add_node(node);
        }
        route.retries = self.retries;

        path.push(target.unwrap_or_default().to_string());
        debug!("route: {}", path.join(" -> "));
        Ok(route)
    }

    fn attempts(&self, opts: &ChainOptions) -> usize {
        if opts.retries > 0 {
            opts.retries
        } else if self.retries > 0 {
            self.retries
        } else {
            hopchain_core::DEFAULT_RETRIES
        }
    }

    async fn dial_with_options(
        &self,
        addr: &str,
        opts: &ChainOptions,
    ) -> Result<BoxStream, ChainError> {
        let route = self.select_route_for(addr)?;
        let target = resolve(addr, opts.resolver.as_deref(), opts.hosts.as_deref()).await;

        let Some(last) = route.last_node() else {
            let conn = TcpDialer::new()
                .dial(&target, opts.timeout)
                .await
                .map_err(|source| ChainError::DirectDial {
                    addr: target.clone(),
                    source,
                })?;
            return Ok(boxed(conn));
        };

        let conn = route.get_conn().await?;
        let connect_opts = ConnectOptions {
            requested_addr: Some(addr.to_string()),
            ..last.connect_options.clone()
        };
        last.client
            .connect(conn, &target, &connect_opts)
            .await
            .map_err(|source| ChainError::Connect {
                node: last.to_string(),
                addr: target,
                source,
            })
    }

    /// Walk the route: the returned stream is handshaken with the last node.
    async fn get_conn(&self) -> Result<BoxStream, ChainError> {
        let nodes = self.nodes();
        let Some((first, rest)) = nodes.split_first() else {
            return Err(ChainError::EmptyChain);
        };

        let conn = match first.client.dial(&first.addr, &first.dial_options).await {
            Ok(conn) => conn,
            Err(source) => {
                first.mark_dead();
                return Err(ChainError::Dial {
                    node: first.to_string(),
                    source,
                });
            }
        };
        let mut conn = match first.client.handshake(conn, &first.handshake_options).await {
            Ok(conn) => conn,
            Err(source) => {
                first.mark_dead();
                return Err(ChainError::Handshake {
                    node: first.to_string(),
                    source,
                });
            }
        };
        first.reset_dead();

        let mut prev = first;
        for node in rest {
            let link = match prev.client.connect(conn, &node.addr, &prev.connect_options).await {
                Ok(link) => link,
                Err(source) => {
                    node.mark_dead();
                    return Err(ChainError::Connect {
                        node: node.to_string(),
                        addr: node.addr.clone(),
                        source,
                    });
                }
            };
            conn = match node.client.handshake(link, &node.handshake_options).await {
                Ok(conn) => conn,
                Err(source) => {
                    node.mark_dead();
                    return Err(ChainError::Handshake {
                        node: node.to_string(),
                        source,
                    });
                }
            };
            node.reset_dead();
            prev = node;
        }

        Ok(conn)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes().iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("groups", &self.groups)
            .field("is_route", &self.is_route)
            .field("retries", &self.retries)
            .finish()
    }
}

/// Dial `addr` through `chain`, or directly when there is none.
pub async fn dial_via(
    chain: Option<&Chain>,
    addr: &str,
    opts: &ChainOptions,
) -> Result<BoxStream, ChainError> {
    match chain {
        Some(chain) => chain.dial(addr, opts).await,
        None => Chain::default().dial(addr, opts).await,
    }
}

/// Replace the host of `host:port` with an address from `hosts`, else from
/// `resolver`. Anything unresolvable is returned unchanged.
pub async fn resolve(
    addr: &str,
    resolver: Option<&dyn Resolver>,
    hosts: Option<&Hosts>,
) -> String {
    let Some((host, port)) = split_host_port_str(addr) else {
        return addr.to_string();
    };

    if let Some(ip) = hosts.and_then(|h| h.lookup(host)) {
        return join_ip_port(ip, port);
    }

    if let Some(resolver) = resolver {
        match resolver.resolve(host).await {
            Ok(ips) => {
                if let Some(ip) = ips.first() {
                    return join_ip_port(*ip, port);
                }
            }
            Err(e) => {
                warn!(host, error = %e, kind = hopchain_core::ERROR_RESOLVE, "resolve failed")
            }
        }
    }

    addr.to_string()
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use hopchain_bypass::Bypass;
    use hopchain_dns::{DnsError, Host};
    use hopchain_transport::TransportError;
    use parking_lot::Mutex;
    use tokio::io::{AsyncReadExt, DuplexStream, duplex};
    use tokio::net::TcpListener;

    use super::*;
    use crate::client::{Client, Connector, DialOptions, HandshakeOptions, Transporter};
    use crate::error::GroupError;
    use crate::group::{DefaultSelector, FailFilter, NodeSelector, Strategy};

    // ── Mocks ──

    #[derive(Default)]
    struct Probe {
        dials: AtomicUsize,
        peers: Mutex<Vec<DuplexStream>>,
        connects: Mutex<Vec<(String, Option<String>)>>,
    }

    #[derive(Clone, Default)]
    struct MockTransporter {
        probe: Arc<Probe>,
        fail_dial: bool,
        fail_handshake: bool,
        multiplex: bool,
    }

    #[async_trait]
    impl Transporter for MockTransporter {
        async fn dial(
            &self,
            _addr: &str,
            _opts: &DialOptions,
        ) -> Result<BoxStream, TransportError> {
            self.probe.dials.fetch_add(1, Ordering::SeqCst);
            if self.fail_dial {
                return Err(std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into());
            }
            let (local, peer) = duplex(1024);
            self.probe.peers.lock().push(peer);
            Ok(boxed(local))
        }

        async fn handshake(
            &self,
            conn: BoxStream,
            _opts: &HandshakeOptions,
        ) -> Result<BoxStream, TransportError> {
            if self.fail_handshake {
                drop(conn);
                return Err(TransportError::protocol("handshake refused"));
            }
            Ok(conn)
        }

        fn multiplex(&self) -> bool {
            self.multiplex
        }
    }

    #[derive(Clone, Default)]
    struct MockConnector {
        probe: Arc<Probe>,
        fail: bool,
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(
            &self,
            conn: BoxStream,
            addr: &str,
            opts: &ConnectOptions,
        ) -> Result<BoxStream, TransportError> {
            self.probe
                .connects
                .lock()
                .push((addr.to_string(), opts.requested_addr.clone()));
            if self.fail {
                return Err(TransportError::protocol("connect refused"));
            }
            Ok(conn)
        }
    }

    /// Fails the first `failures` selections, then returns the first node.
    struct FlakySelector {
        calls: AtomicUsize,
        failures: usize,
    }

    impl FlakySelector {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl NodeSelector for FlakySelector {
        fn select(&self, nodes: &[Node]) -> Result<Node, GroupError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(GroupError::Selector("flaky".into()));
            }
            nodes.first().cloned().ok_or(GroupError::NoNodes)
        }
    }

    struct StaticResolver(Option<Vec<IpAddr>>);

    #[async_trait]
    impl Resolver for StaticResolver {
        async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
            self.0.clone().ok_or_else(|| DnsError::NoResults(host.to_string()))
        }
    }

    fn mock_node(id: usize, probe: &Arc<Probe>, transporter: MockTransporter) -> Node {
        let connector = MockConnector {
            probe: probe.clone(),
            fail: false,
        };
        let transporter = MockTransporter {
            probe: probe.clone(),
            ..transporter
        };
        Node::new(id, format!("hop{id}.test:{}", 1000 + id), Client::new(connector, transporter))
    }

    fn ok_node(id: usize, probe: &Arc<Probe>) -> Node {
        mock_node(id, probe, MockTransporter::default())
    }

    fn fifo(nodes: Vec<Node>, filtered: bool) -> NodeGroup {
        let filters: Vec<Box<dyn crate::group::NodeFilter>> = if filtered {
            vec![Box::new(FailFilter::default())]
        } else {
            Vec::new()
        };
        NodeGroup::with_selector(nodes, Arc::new(DefaultSelector::new(Strategy::Fifo, filters)))
    }

    fn ids(chain: &Chain) -> Vec<usize> {
        chain.nodes().iter().map(|n| n.id).collect()
    }

    // ── Route selection ──

    #[test]
    fn empty_chain_selects_empty_route() {
        let chain = Chain::default();
        assert!(chain.select_route().unwrap().is_empty());
        assert!(chain.select_route_for("example.com:443").unwrap().is_empty());
    }

    #[test]
    fn one_node_per_group_in_order() {
        let probe = Arc::new(Probe::default());
        let chain = Chain::from_groups([
            fifo(vec![ok_node(1, &probe), ok_node(2, &probe)], true),
            fifo(vec![ok_node(3, &probe), ok_node(4, &probe)], true),
            fifo(vec![ok_node(5, &probe)], true),
        ])
        .with_retries(4);

        let route = chain.select_route_for("example.com:443").unwrap();
        assert!(route.is_route());
        assert_eq!(ids(&route), vec![1, 3, 5]);
        assert_eq!(route.retries, 4);
        assert_eq!(route.last_node().unwrap().id, 5);
    }

    #[test]
    fn route_selects_itself() {
        let probe = Arc::new(Probe::default());
        let chain = Chain::new([ok_node(1, &probe), ok_node(2, &probe)]);
        let route = chain.select_route().unwrap();
        let again = route.select_route().unwrap();
        assert_eq!(ids(&again), ids(&route));
        assert!(again.node_groups()[0].same_group(&route.node_groups()[0]));
    }

    #[test]
    fn bypass_yields_empty_route() {
        let probe = Arc::new(Probe::default());
        let bypass = || Bypass::new(["*.internal", "10.0.0.0/8"], false).unwrap();
        let chain = Chain::new([
            ok_node(1, &probe).with_bypass(bypass()),
            ok_node(2, &probe).with_bypass(bypass()),
        ]);

        let route = chain.select_route_for("db.internal:5432").unwrap();
        assert!(route.is_empty());
        let route = chain.select_route_for("10.1.2.3:22").unwrap();
        assert!(route.is_empty());
        assert!(chain.nodes().iter().all(|n| n.fail_count() == 0));

        let route = chain.select_route_for("example.com:443").unwrap();
        assert_eq!(ids(&route), vec![1, 2]);
    }

    #[test]
    fn bypass_on_later_hop_stops_selection() {
        let probe = Arc::new(Probe::default());
        let chain = Chain::new([
            ok_node(1, &probe),
            ok_node(2, &probe).with_bypass(Bypass::new(["example.com"], false).unwrap()),
        ]);
        assert!(chain.select_route_for("example.com:80").unwrap().is_empty());
        // Bypass is ignored without a target.
        assert_eq!(ids(&chain.select_route().unwrap()), vec![1, 2]);
    }

    #[test]
    fn selection_error_propagates() {
        let chain = Chain::from_groups([NodeGroup::new(Vec::new())]);
        assert!(matches!(
            chain.select_route(),
            Err(ChainError::Selection(GroupError::NoNodes))
        ));
    }

    #[test]
    fn multiplex_last_hop_folds_prefix() {
        let probe = Arc::new(Probe::default());
        let mux = MockTransporter {
            multiplex: true,
            ..MockTransporter::default()
        };
        let chain = Chain::new([ok_node(1, &probe), ok_node(2, &probe), mock_node(3, &probe, mux)]);

        let route = chain.select_route_for("example.com:443").unwrap();
        assert_eq!(ids(&route), vec![3]);
        let sub = route.nodes()[0].dial_options.chain.clone().unwrap();
        assert!(sub.is_route());
        assert_eq!(ids(&sub), vec![1, 2]);
    }

    #[test]
    fn multiplex_middle_hop_folds_prefix() {
        let probe = Arc::new(Probe::default());
        let mux = MockTransporter {
            multiplex: true,
            ..MockTransporter::default()
        };
        let chain = Chain::new([ok_node(1, &probe), mock_node(2, &probe, mux), ok_node(3, &probe)]);

        let route = chain.select_route().unwrap();
        assert_eq!(ids(&route), vec![2, 3]);
        let nodes = route.nodes();
        assert_eq!(ids(nodes[0].dial_options.chain.as_ref().unwrap()), vec![1]);
        assert!(nodes[1].dial_options.chain.is_none());
    }

    #[test]
    fn consecutive_multiplex_hops_nest() {
        let probe = Arc::new(Probe::default());
        let mux = MockTransporter {
            multiplex: true,
            ..MockTransporter::default()
        };
        let chain = Chain::new([mock_node(1, &probe, mux.clone()), mock_node(2, &probe, mux)]);

        let route = chain.select_route().unwrap();
        assert_eq!(ids(&route), vec![2]);
        let outer = route.nodes()[0].dial_options.chain.clone().unwrap();
        assert_eq!(ids(&outer), vec![1]);
        let inner = outer.nodes()[0].dial_options.chain.clone().unwrap();
        assert!(inner.is_empty());
    }

    #[test]
    fn route_display() {
        let probe = Arc::new(Probe::default());
        let chain = Chain::new([
            ok_node(1, &probe).with_protocol("relay", "tcp"),
            ok_node(2, &probe),
        ]);
        assert_eq!(chain.to_string(), "relay+tcp://hop1.test:1001 -> hop2.test:1002");
    }

    // ── Connection walk ──

    #[tokio::test]
    async fn conn_on_empty_chain_fails() {
        let result = Chain::default().conn(&ChainOptions::default()).await;
        assert!(matches!(result, Err(ChainError::EmptyChain)));
    }

    #[tokio::test]
    async fn walk_connects_each_hop_to_the_next() {
        let probe = Arc::new(Probe::default());
        let nodes = vec![ok_node(1, &probe), ok_node(2, &probe), ok_node(3, &probe)];
        let chain = Chain::from_groups(nodes.into_iter().map(|n| fifo(vec![n], false)));
        for group in chain.node_groups() {
            group.get_node(0).unwrap().mark_dead();
        }

        chain.conn(&ChainOptions::default()).await.unwrap();

        assert_eq!(probe.dials.load(Ordering::SeqCst), 1);
        let connects: Vec<String> = probe.connects.lock().iter().map(|(a, _)| a.clone()).collect();
        assert_eq!(connects, vec!["hop2.test:1002", "hop3.test:1003"]);
        assert!(chain.nodes().iter().all(|n| n.fail_count() == 0));
    }

    #[tokio::test]
    async fn handshake_failure_closes_link_and_marks_only_that_hop() {
        let probe = Arc::new(Probe::default());
        let failing = MockTransporter {
            fail_handshake: true,
            ..MockTransporter::default()
        };
        let chain = Chain::new([
            ok_node(1, &probe),
            ok_node(2, &probe),
            mock_node(3, &probe, failing),
        ]);

        let result = chain.conn(&ChainOptions::default()).await;
        match result {
            Err(ChainError::Handshake { node, .. }) => assert_eq!(node, "hop3.test:1003"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }

        let fails: Vec<u32> = chain.nodes().iter().map(Node::fail_count).collect();
        assert_eq!(fails, vec![0, 0, 1]);

        let mut peer = probe.peers.lock().pop().unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn connect_failure_marks_the_next_hop() {
        let probe = Arc::new(Probe::default());
        let refusing = Client::new(
            MockConnector {
                probe: probe.clone(),
                fail: true,
            },
            MockTransporter {
                probe: probe.clone(),
                ..MockTransporter::default()
            },
        );
        let first = Node::new(1, "hop1.test:1001", refusing);
        let chain = Chain::new([first, ok_node(2, &probe)]);

        let result = chain.conn(&ChainOptions::default()).await;
        assert!(
            matches!(result, Err(ChainError::Connect { ref node, .. }) if node == "hop2.test:1002")
        );
        let fails: Vec<u32> = chain.nodes().iter().map(Node::fail_count).collect();
        assert_eq!(fails, vec![0, 1]);
    }

    #[tokio::test]
    async fn dial_failure_falls_over_to_standby() {
        let probe = Arc::new(Probe::default());
        let broken = MockTransporter {
            fail_dial: true,
            ..MockTransporter::default()
        };
        let group = fifo(vec![mock_node(1, &probe, broken), ok_node(2, &probe)], true);
        let chain = Chain::from_groups([group.clone()]).with_retries(2);

        chain.dial("example.com:443", &ChainOptions::default()).await.unwrap();

        assert_eq!(group.get_node(0).unwrap().fail_count(), 1);
        assert_eq!(group.get_node(1).unwrap().fail_count(), 0);
        assert_eq!(probe.dials.load(Ordering::SeqCst), 2);
        assert_eq!(
            probe.connects.lock().as_slice(),
            &[("example.com:443".to_string(), Some("example.com:443".to_string()))]
        );
    }

    // ── Retries ──

    #[tokio::test]
    async fn dial_retries_selection() {
        let probe = Arc::new(Probe::default());
        let selector = FlakySelector::new(2);
        let group = NodeGroup::with_selector(vec![ok_node(1, &probe)], selector.clone());
        let chain = Chain::from_groups([group]).with_retries(3);

        chain.dial("example.com:443", &ChainOptions::default()).await.unwrap();
        assert_eq!(selector.calls(), 3);
    }

    #[tokio::test]
    async fn dial_gives_up_after_retries() {
        let probe = Arc::new(Probe::default());
        let selector = FlakySelector::new(5);
        let group = NodeGroup::with_selector(vec![ok_node(1, &probe)], selector.clone());
        let chain = Chain::from_groups([group]).with_retries(2);

        let result = chain.dial("example.com:443", &ChainOptions::default()).await;
        assert!(matches!(result, Err(ChainError::Selection(GroupError::Selector(_)))));
        assert_eq!(selector.calls(), 2);
    }

    #[tokio::test]
    async fn option_retries_override_chain() {
        let probe = Arc::new(Probe::default());
        let selector = FlakySelector::new(usize::MAX);
        let group = NodeGroup::with_selector(vec![ok_node(1, &probe)], selector.clone());
        let chain = Chain::from_groups([group]).with_retries(5);

        let _ = chain.dial("example.com:443", &ChainOptions::new().retries(2)).await;
        assert_eq!(selector.calls(), 2);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let probe = Arc::new(Probe::default());
        let selector = FlakySelector::new(usize::MAX);
        let group = NodeGroup::with_selector(vec![ok_node(1, &probe)], selector.clone());
        let chain = Chain::from_groups([group]);

        let _ = chain.conn(&ChainOptions::default()).await;
        assert_eq!(selector.calls(), 1);
    }

    #[tokio::test]
    async fn conn_reselects_on_every_attempt() {
        let probe = Arc::new(Probe::default());
        let selector = FlakySelector::new(1);
        let group = NodeGroup::with_selector(vec![ok_node(1, &probe)], selector.clone());
        let chain = Chain::from_groups([group]).with_retries(3);

        chain.conn(&ChainOptions::default()).await.unwrap();
        assert_eq!(selector.calls(), 2);
    }

    // ── Resolution ──

    #[tokio::test]
    async fn final_connect_gets_resolved_target() {
        let probe = Arc::new(Probe::default());
        let chain = Chain::new([ok_node(1, &probe)]);
        let hosts = Hosts::new(vec![Host::new("10.0.0.1".parse().unwrap(), "example.com")]);
        let opts = ChainOptions::new().hosts(Arc::new(hosts));

        chain.dial("example.com:443", &opts).await.unwrap();
        assert_eq!(
            probe.connects.lock().as_slice(),
            &[("10.0.0.1:443".to_string(), Some("example.com:443".to_string()))]
        );
    }

    #[tokio::test]
    async fn hosts_take_precedence() {
        let hosts = Hosts::new(vec![Host::new("10.0.0.1".parse().unwrap(), "example.com")]);
        let resolver = StaticResolver(Some(vec!["10.0.0.2".parse().unwrap()]));
        let target = resolve("example.com:443", Some(&resolver), Some(&hosts)).await;
        assert_eq!(target, "10.0.0.1:443");
    }

    #[tokio::test]
    async fn resolver_first_answer_wins() {
        let resolver = StaticResolver(Some(vec![
            "::1".parse().unwrap(),
            "10.0.0.2".parse().unwrap(),
        ]));
        let target = resolve("example.com:443", Some(&resolver), None).await;
        assert_eq!(target, "[::1]:443");
    }

    #[tokio::test]
    async fn unresolvable_addr_is_unchanged() {
        let failing = StaticResolver(None);
        assert_eq!(resolve("example.com:443", Some(&failing), None).await, "example.com:443");

        let empty = StaticResolver(Some(Vec::new()));
        assert_eq!(resolve("example.com:443", Some(&empty), None).await, "example.com:443");

        assert_eq!(resolve("example.com", None, None).await, "example.com");
        assert_eq!(resolve("example.com:443", None, None).await, "example.com:443");
    }

    // ── Direct dial ──

    #[tokio::test]
    async fn empty_route_dials_directly() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        let probe = Arc::new(Probe::default());
        let bypass = Bypass::new(["127.0.0.1"], false).unwrap();
        let chain = Chain::new([ok_node(1, &probe).with_bypass(bypass)]);
        chain.dial(&addr, &ChainOptions::default()).await.unwrap();

        accept.await.unwrap().unwrap();
        assert_eq!(probe.dials.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dial_via_without_chain() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        dial_via(None, &addr, &ChainOptions::new().timeout(Duration::from_secs(5)))
            .await
            .unwrap();
        accept.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn direct_dial_failure_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = Chain::default().dial(&addr, &ChainOptions::default()).await;
        assert!(matches!(result, Err(ChainError::DirectDial { .. })));
    }
}
