//! # hopchain-rs
//!
//! Multi-hop proxy chains with per-hop failover and bypass rules.
//!
//! ## Crates
//!
//! - [`hopchain_core`] - Shared defaults and log labels
//! - [`hopchain_dns`] - Hosts table, resolver and address helpers
//! - [`hopchain_bypass`] - Bypass rule matching
//! - [`hopchain_transport`] - Stream type, TCP dialing and TLS handshakes
//! - [`hopchain`] - Chains, node groups, route selection and dialing

pub use hopchain as chain;
pub use hopchain_bypass as bypass;
pub use hopchain_core as core;
pub use hopchain_dns as dns;
pub use hopchain_transport as transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use hopchain::config::{ChainConfig, load_config};
    pub use hopchain::{Chain, ChainError, ChainOptions, Node, NodeGroup, dial_via};
    pub use hopchain_dns::{Hosts, Resolver};
}
