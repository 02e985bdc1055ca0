//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Chain Defaults
// ============================================================================

/// Default number of end-to-end attempts when neither the chain nor the
/// call site sets one.
pub const DEFAULT_RETRIES: usize = 1;

// ============================================================================
// Node Health Defaults
// ============================================================================

/// Default number of failures before a node is skipped by selection.
pub const DEFAULT_MAX_FAILS: u32 = 1;
/// Default time a failed node stays excluded from selection, in seconds.
pub const DEFAULT_FAIL_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Timeout Defaults
// ============================================================================

/// Default timeout for the direct (no-proxy) dial, in seconds. 0 = none.
pub const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 10;
/// Default TLS handshake timeout in seconds.
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// TCP Socket Defaults
// ============================================================================

/// Default TCP_NODELAY (disable Nagle's algorithm for lower latency).
pub const DEFAULT_TCP_NO_DELAY: bool = true;

// ============================================================================
// DNS Defaults
// ============================================================================

/// Default DNS cache capacity (entries).
pub const DEFAULT_DNS_CACHE_SIZE: usize = 256;

// ============================================================================
// Protocol Constants
// ============================================================================

/// Relay handshake hash length (SHA-224 hex = 56 chars).
pub const HASH_LEN: usize = 56;
/// Maximum relay handshake target length (host:port).
pub const MAX_TARGET_LEN: usize = 260;
/// Maximum relay handshake metadata line length.
pub const MAX_METADATA_LEN: usize = 512;
