//! Name resolution for hopchain.
//!
//! Three pieces cooperate when a chain resolves a target before dialing:
//!
//! - [`Hosts`]: static overrides, consulted first.
//! - [`Resolver`]: the lookup contract, with [`DnsResolver`] as a shared,
//!   caching implementation backed by
//!   [`hickory-resolver`](https://crates.io/crates/hickory-resolver)
//!   (UDP/TCP, DNS-over-TLS, DNS-over-HTTPS).
//! - [`addr`]: `host:port` splitting and joining with IPv6 brackets.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hopchain_dns::{DnsConfig, DnsResolver, Resolver};
//!
//! # async fn example() -> Result<(), hopchain_dns::DnsError> {
//! let resolver = DnsResolver::new(&DnsConfig::default())?;
//! let ips = resolver.resolve("example.com").await?;
//! println!("resolved: {ips:?}");
//! # Ok(())
//! # }
//! ```

pub mod addr;
pub mod config;
pub mod error;
pub mod hosts;
pub mod resolver;

pub use addr::{join_host_port, join_ip_port, split_host_port, split_host_port_str};
pub use config::{DnsConfig, DnsStrategy};
pub use error::DnsError;
pub use hosts::{Host, Hosts};
pub use resolver::{DnsResolver, Resolver};
