//! Error types for notice construction and configuration

use thiserror::Error;

/// Errors raised while turning host input into a notice
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NoticeError {
    /// The input is neither a fault object nor a mapping
    #[error("malformed notice input: expected a fault or a mapping, got {0}")]
    MalformedInput(String),

    /// A user-agent pattern failed to compile
    #[error("invalid user agent pattern: {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
