//! Matchers backing a bypass rule set.

pub mod domain;
pub mod ip;

pub use domain::{DomainMatcher, WildcardMatcher};
pub use ip::CidrMatcher;
