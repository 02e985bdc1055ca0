//! Error types for bypass rule parsing.

use thiserror::Error;

/// Errors that can occur while building a bypass rule set.
#[derive(Error, Debug)]
pub enum BypassError {
    #[error("invalid bypass pattern: {0}")]
    InvalidPattern(String),
}
