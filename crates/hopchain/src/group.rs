//! Node groups and node selection.
//!
//! A [`NodeGroup`] holds the interchangeable candidates for one hop of a
//! chain. Each call to [`NodeGroup::next`] runs the group's
//! [`NodeSelector`]; the default selector drops ineligible nodes through a
//! list of [`NodeFilter`]s and then applies a [`SelectPolicy`].
//!
//! Groups also own liveness bookkeeping. Nodes keep a weak handle to the
//! group they were drawn from and report failures by id through it.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GroupError;
use crate::node::Node;

// ── Strategy enum (for serde config) ──

/// Selection strategy identifier, used in configuration files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    Random,
    Fifo,
}

impl Strategy {
    fn policy(self) -> Box<dyn SelectPolicy> {
        match self {
            Strategy::RoundRobin => Box::new(RoundRobin::new()),
            Strategy::Random => Box::new(Random),
            Strategy::Fifo => Box::new(Fifo),
        }
    }
}

// ── Traits ──

/// Picks one node out of a group's candidates.
pub trait NodeSelector: Send + Sync + 'static {
    fn select(&self, nodes: &[Node]) -> Result<Node, GroupError>;
}

/// Picks an index among the nodes that survived filtering.
pub trait SelectPolicy: Send + Sync + 'static {
    /// Returns `None` if `nodes` is empty.
    fn select(&self, nodes: &[&Node]) -> Option<usize>;
}

/// Eligibility check applied before the policy runs.
pub trait NodeFilter: Send + Sync + 'static {
    fn accept(&self, node: &Node) -> bool;
}

// ── Built-in policies ──

/// Round-robin policy: cycles through nodes sequentially.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectPolicy for RoundRobin {
    fn select(&self, nodes: &[&Node]) -> Option<usize> {
        if nodes.is_empty() {
            return None;
        }
        Some(self.counter.fetch_add(1, Ordering::Relaxed) % nodes.len())
    }
}

/// Uniformly random choice.
#[derive(Debug, Default)]
pub struct Random;

impl SelectPolicy for Random {
    fn select(&self, nodes: &[&Node]) -> Option<usize> {
        if nodes.is_empty() {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..nodes.len()))
    }
}

/// Always the first eligible node, so later nodes act as standbys.
#[derive(Debug, Default)]
pub struct Fifo;

impl SelectPolicy for Fifo {
    fn select(&self, nodes: &[&Node]) -> Option<usize> {
        if nodes.is_empty() { None } else { Some(0) }
    }
}

// ── Built-in filters ──

/// Excludes nodes that failed `max_fails` times within `fail_timeout`.
///
/// A node becomes eligible again once its last failure is older than
/// `fail_timeout`, or when a successful handshake resets it.
/// `max_fails == 0` disables the filter.
#[derive(Debug, Clone)]
pub struct FailFilter {
    pub max_fails: u32,
    pub fail_timeout: Duration,
}

impl Default for FailFilter {
    fn default() -> Self {
        Self {
            max_fails: hopchain_core::DEFAULT_MAX_FAILS,
            fail_timeout: Duration::from_secs(hopchain_core::DEFAULT_FAIL_TIMEOUT_SECS),
        }
    }
}

impl NodeFilter for FailFilter {
    fn accept(&self, node: &Node) -> bool {
        if self.max_fails == 0 || node.fail_count() < self.max_fails {
            return true;
        }
        node.last_failure()
            .is_none_or(|when| when.elapsed() >= self.fail_timeout)
    }
}

/// Excludes nodes whose address has no usable port.
#[derive(Debug, Clone, Default)]
pub struct InvalidFilter;

impl NodeFilter for InvalidFilter {
    fn accept(&self, node: &Node) -> bool {
        hopchain_dns::split_host_port(&node.addr).is_ok_and(|(_, port)| port > 0)
    }
}

// ── Default selector ──

/// Filters, then applies a policy.
pub struct DefaultSelector {
    policy: Box<dyn SelectPolicy>,
    filters: Vec<Box<dyn NodeFilter>>,
}

impl DefaultSelector {
    pub fn new(strategy: Strategy, filters: Vec<Box<dyn NodeFilter>>) -> Self {
        Self::with_policy(strategy.policy(), filters)
    }

    pub fn with_policy(policy: Box<dyn SelectPolicy>, filters: Vec<Box<dyn NodeFilter>>) -> Self {
        Self { policy, filters }
    }
}

impl Default for DefaultSelector {
    fn default() -> Self {
        Self::new(Strategy::RoundRobin, vec![Box::new(FailFilter::default())])
    }
}

impl NodeSelector for DefaultSelector {
    fn select(&self, nodes: &[Node]) -> Result<Node, GroupError> {
        if nodes.is_empty() {
            return Err(GroupError::NoNodes);
        }

        let eligible: Vec<&Node> = nodes
            .iter()
            .filter(|node| self.filters.iter().all(|f| f.accept(node)))
            .collect();

        let idx = self.policy.select(&eligible).ok_or(GroupError::NoneAvailable)?;
        eligible
            .get(idx)
            .map(|node| (*node).clone())
            .ok_or(GroupError::NoneAvailable)
    }
}

// ── NodeGroup ──

struct GroupInner {
    nodes: RwLock<Vec<Node>>,
    selector: RwLock<Arc<dyn NodeSelector>>,
}

/// Interchangeable candidates for one hop.
///
/// Cloning is cheap and yields a handle to the same group.
#[derive(Clone)]
pub struct NodeGroup {
    inner: Arc<GroupInner>,
}

/// Non-owning back-reference from a node to its group.
#[derive(Clone)]
pub(crate) struct GroupHandle(Weak<GroupInner>);

impl GroupHandle {
    pub(crate) fn upgrade(&self) -> Option<NodeGroup> {
        self.0.upgrade().map(|inner| NodeGroup { inner })
    }
}

impl NodeGroup {
    /// Group with the default round-robin selector and fail filter.
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self::with_selector(nodes, Arc::new(DefaultSelector::default()))
    }

    pub fn with_selector(
        nodes: impl IntoIterator<Item = Node>,
        selector: Arc<dyn NodeSelector>,
    ) -> Self {
        let group = Self {
            inner: Arc::new(GroupInner {
                nodes: RwLock::new(Vec::new()),
                selector: RwLock::new(selector),
            }),
        };
        group.add_node(nodes);
        group
    }

    /// Append nodes. A node that already belongs to a group keeps reporting
    /// to that group.
    pub fn add_node(&self, nodes: impl IntoIterator<Item = Node>) {
        let handle = GroupHandle(Arc::downgrade(&self.inner));
        let mut guard = self.inner.nodes.write();
        for mut node in nodes {
            if node.group.is_none() {
                node.group = Some(handle.clone());
            }
            guard.push(node);
        }
    }

    pub fn set_selector(&self, selector: Arc<dyn NodeSelector>) {
        *self.inner.selector.write() = selector;
    }

    /// Snapshot of the current members.
    pub fn nodes(&self) -> Vec<Node> {
        self.inner.nodes.read().clone()
    }

    pub fn get_node(&self, index: usize) -> Option<Node> {
        self.inner.nodes.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.read().is_empty()
    }

    /// Draw a node using the group's selector.
    pub fn next(&self) -> Result<Node, GroupError> {
        let selector = self.inner.selector.read().clone();
        let nodes = self.inner.nodes.read();
        selector.select(&nodes)
    }

    /// Record a failure against the member with `id`.
    pub fn mark_dead_node(&self, id: usize) {
        if let Some(node) = self.inner.nodes.read().iter().find(|n| n.id == id) {
            node.marker.mark();
        }
    }

    /// Clear the failure record of the member with `id`.
    pub fn reset_dead_node(&self, id: usize) {
        if let Some(node) = self.inner.nodes.read().iter().find(|n| n.id == id) {
            node.marker.reset();
        }
    }

    /// Whether `other` is a handle to this same group.
    pub fn same_group(&self, other: &NodeGroup) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NodeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeGroup")
            .field("nodes", &*self.inner.nodes.read())
            .finish()
    }
}

// ── Tests ──
