//! Token service error types.
//!
//! Every failure that leaves [`TokenLifecycle`](crate::TokenLifecycle) is
//! either [`TokenError::NotFound`] (`PR001`) or [`TokenError::OperationFailed`]
//! (`PR000`). The remaining variants are produced inside an operation body and
//! folded into `OperationFailed` by the resiliency layer.

use std::fmt;

use rust_common::{PlatformError, Retryable};
use thiserror::Error;

/// Stable error code exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Generic operation failure
    OperationFailed,
    /// Addressed record does not exist
    NotFound,
}

impl ErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OperationFailed => "PR000",
            Self::NotFound => "PR001",
        }
    }

    /// HTTP-equivalent status for the code.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::OperationFailed => 500,
            Self::NotFound => 404,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token service errors.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Strict lookup found no record
    #[error("Not Found")]
    NotFound {
        /// Record set that was searched
        set: String,
        /// Record id that was searched
        id: String,
    },

    /// Operation failed after resiliency handling
    #[error("{message}")]
    OperationFailed {
        /// Underlying failure description
        message: String,
    },

    /// Keyed store failure
    #[error("Store error: {0}")]
    Store(#[from] PlatformError),

    /// JWT encoding or decoding failure
    #[error("JWT signing error: {0}")]
    Signing(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TokenError {
    /// Create a not-found error for a record.
    #[must_use]
    pub fn not_found(set: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            set: set.into(),
            id: id.into(),
        }
    }

    /// Create an operation failure with the given message.
    #[must_use]
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a signing error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing(message.into())
    }

    /// Check whether this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Caller-facing code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            _ => ErrorCode::OperationFailed,
        }
    }

    /// HTTP-equivalent status.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    /// Fold internal variants into the two caller-facing kinds.
    #[must_use]
    pub fn into_boundary(self) -> Self {
        match self {
            Self::NotFound { .. } | Self::OperationFailed { .. } => self,
            other => Self::operation_failed(other.to_string()),
        }
    }
}

impl Retryable for TokenError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Signing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(TokenError::not_found("app_tokens", "u1").code().as_str(), "PR001");
        assert_eq!(TokenError::operation_failed("boom").code().as_str(), "PR000");
        assert_eq!(TokenError::config("bad").code(), ErrorCode::OperationFailed);
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TokenError::not_found("s", "id").http_status(), 404);
        assert_eq!(TokenError::operation_failed("boom").http_status(), 500);
        assert_eq!(TokenError::Store(PlatformError::timeout("GET")).http_status(), 500);
    }

    #[test]
    fn test_only_transient_store_errors_retry() {
        assert!(TokenError::Store(PlatformError::unavailable("refused")).is_retryable());
        assert!(TokenError::Store(PlatformError::timeout("read")).is_retryable());
        assert!(!TokenError::Store(PlatformError::serialization("bad")).is_retryable());
        assert!(!TokenError::not_found("s", "id").is_retryable());
        assert!(!TokenError::signing("key").is_retryable());
    }

    #[test]
    fn test_into_boundary() {
        let err = TokenError::Store(PlatformError::unavailable("refused")).into_boundary();
        assert!(matches!(err, TokenError::OperationFailed { .. }));
        assert_eq!(err.to_string(), "Store error: Service unavailable: refused");

        let err = TokenError::not_found("s", "id").into_boundary();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not Found");
    }
}
