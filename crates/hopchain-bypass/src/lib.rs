//! Bypass rules for hopchain nodes.
//!
//! A [`Bypass`] attached to a node tells route selection that a target should
//! not be proxied through that hop. Matching covers single addresses, CIDR
//! ranges, exact domains, domain suffixes and glob patterns, and a rule set
//! can be reversed into a whitelist.

pub mod bypass;
pub mod error;
pub mod matcher;

pub use bypass::Bypass;
pub use error::BypassError;
