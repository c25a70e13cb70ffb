//! Error taxonomy for intercepted calls and synthesized responses.

use thiserror::Error;

/// Errors surfaced by the intercepted primitive and by synthesized responses.
///
/// `Clone` is required so a standing throw rule can fire on every matching
/// call, not just the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// No primitive was installed at the target slot and a call fell through.
    #[error("fetch is not defined. tried fetching \"{url}\"")]
    NotDefined {
        /// The URL the caller attempted to reach.
        url: String,
    },

    /// A body accessor was invoked a second time on the same response.
    #[error("body is already in use")]
    BodyAlreadyUsed,

    /// A type-specific body accessor did not match the stored body's shape.
    #[error("mocked body is not {expected}")]
    BodyTypeMismatch {
        /// The shape the accessor expected.
        expected: &'static str,
    },

    /// A header name contained characters outside the token set.
    #[error("invalid header name \"{0}\"")]
    InvalidHeaderName(String),

    /// An error registered with a throw rule, surfaced as-is to the caller.
    #[error("{0}")]
    Thrown(String),
}

impl FetchError {
    /// Wrap a plain message into a thrown error, the way a throw rule
    /// registered with a string does.
    pub fn thrown(message: impl Into<String>) -> Self {
        FetchError::Thrown(message.into())
    }
}

impl From<&str> for FetchError {
    fn from(message: &str) -> Self {
        FetchError::thrown(message)
    }
}

impl From<String> for FetchError {
    fn from(message: String) -> Self {
        FetchError::Thrown(message)
    }
}
