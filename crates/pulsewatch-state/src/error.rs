//! Validation error types.

use thiserror::Error;

/// Rejections for malformed registration requests.
///
/// These are caller-correctable: the message names the offending
/// parameter and the accepted form or range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("`{0}` is not a valid url or ip address")]
    InvalidTarget(String),

    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}
