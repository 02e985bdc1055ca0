//! Multi-hop proxy chains.
//!
//! A [`Chain`] is an ordered list of [`NodeGroup`]s. Dialing a target
//! selects one [`Node`] per group, walks the hops (dial, handshake, connect
//! onward) and returns a stream that reaches the target:
//!
//! ```text
//! caller → node₁ → node₂ → … → nodeₙ → target
//! ```
//!
//! - Nodes whose bypass rules match the target end selection early, and the
//!   target is dialed directly.
//! - A node whose transporter multiplexes dials through the route selected
//!   before it, so the route handed back starts at that node.
//! - Hop failures are recorded on the node's group and steer later
//!   selections away from it until it recovers.
//!
//! Chains are usually built from a TOML file, see [`config`].

pub mod chain;
pub mod cli;
pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod group;
pub mod node;
pub mod transport;

pub use chain::{Chain, ChainOptions, dial_via, resolve};
pub use client::{Client, ConnectOptions, Connector, DialOptions, HandshakeOptions, Transporter};
pub use error::{ChainError, GroupError};
pub use group::{NodeGroup, NodeSelector, Strategy};
pub use node::Node;
