//! Error kind labels for logging.
//!
//! These constants provide consistent error classification across all crates.

/// Node selection found no eligible node.
pub const ERROR_SELECT: &str = "select";
/// Dialing the first hop failed.
pub const ERROR_DIAL: &str = "dial";
/// Transport handshake with a hop failed.
pub const ERROR_HANDSHAKE: &str = "handshake";
/// Logical connect through a hop failed.
pub const ERROR_CONNECT: &str = "connect";
/// DNS/address resolution error.
pub const ERROR_RESOLVE: &str = "resolve";
/// Timeout error.
pub const ERROR_TIMEOUT: &str = "timeout";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";
/// I/O error.
pub const ERROR_IO: &str = "io";
