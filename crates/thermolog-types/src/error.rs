//! Error types for input parsing in thermolog-types.

use thiserror::Error;

/// Errors that can occur when parsing entity ids and day keys.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The day key is not a valid `YYYY-MM-DD` calendar date.
    #[error("Invalid day key '{0}': expected YYYY-MM-DD")]
    InvalidDayKey(String),

    /// The entity id cannot be mapped to a single directory.
    #[error("Invalid entity id '{id}': {reason}")]
    InvalidEntityId {
        /// The rejected id.
        id: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// Result type alias using thermolog-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
