//! Platform error classification.
//!
//! Backend adapters map their native failures into [`PlatformError`] so that
//! the resiliency layer can tell a transient infrastructure failure (worth
//! another attempt) from a permanent one.

use thiserror::Error;

/// Classification seam used by [`RetryPolicy`](crate::RetryPolicy).
///
/// Only errors reporting `true` are attempted again; everything else is
/// returned to the caller after the first failing attempt.
pub trait Retryable {
    /// Whether another attempt of the same operation may succeed.
    fn is_retryable(&self) -> bool;
}

/// Common error type for platform backends.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Backend could not be reached or dropped the connection
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer within the client deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Stored data could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Circuit breaker is open for the specified operation
    #[error("Circuit breaker open for {operation}")]
    CircuitOpen {
        /// The guarded operation name
        operation: String,
    },

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend rejected the command for a non-transient reason
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Check if this error is transient.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// assert!(PlatformError::timeout("read").is_transient());
    /// assert!(!PlatformError::internal("WRONGTYPE").is_transient());
    /// ```
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a timeout error with the given message.
    #[must_use]
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a serialization error with the given message.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a circuit open error for the given operation.
    #[must_use]
    pub fn circuit_open(operation: impl Into<String>) -> Self {
        Self::CircuitOpen {
            operation: operation.into(),
        }
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error with the given message.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl Retryable for PlatformError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(PlatformError::unavailable("conn refused").is_retryable());
        assert!(PlatformError::timeout("read").is_retryable());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!PlatformError::internal("WRONGTYPE").is_retryable());
        assert!(!PlatformError::serialization("bad int").is_retryable());
        assert!(!PlatformError::invalid_input("empty id").is_retryable());
        assert!(!PlatformError::circuit_open("Dynamic.Get").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = PlatformError::circuit_open("Dynamic.Refresh");
        assert_eq!(err.to_string(), "Circuit breaker open for Dynamic.Refresh");

        let err = PlatformError::timeout("HGETALL");
        assert_eq!(err.to_string(), "Operation timed out: HGETALL");
    }

    #[test]
    fn test_from_serde_json() {
        let err: PlatformError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, PlatformError::Serialization(_)));
    }
}
