//! Unified error system for SlowGate
//!
//! Every contract entry point surfaces exactly one of these variants to its
//! caller. Nothing is retried or recovered locally; the host discards the state
//! changes of a transition that returned an error.

use serde::{Deserialize, Serialize};

/// Unified error type for all SlowGate operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SlowGateError {
    /// A business call reached a proxy whose logic address is not (yet) usable
    #[error("Not initialized: {message}")]
    NotInitialized {
        /// What was not initialized
        message: String,
    },

    /// One-time initialization was attempted a second time
    #[error("Already initialized: {message}")]
    AlreadyInitialized {
        /// What was already initialized
        message: String,
    },

    /// Caller does not hold the required write authority
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message describing the rejected caller
        message: String,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// A membership proof did not match the published root
    #[error("Proof rejected: {message}")]
    ProofRejected {
        /// Error message describing the verification failure
        message: String,
    },

    /// Storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl SlowGateError {
    /// Create a not initialized error
    pub fn not_initialized(message: impl Into<String>) -> Self {
        Self::NotInitialized {
            message: message.into(),
        }
    }

    /// Create an already initialized error
    pub fn already_initialized(message: impl Into<String>) -> Self {
        Self::AlreadyInitialized {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a proof rejected error
    pub fn proof_rejected(message: impl Into<String>) -> Self {
        Self::ProofRejected {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Standard Result type for SlowGate operations
pub type Result<T> = std::result::Result<T, SlowGateError>;

impl From<std::io::Error> for SlowGateError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::storage(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SlowGateError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SlowGateError::not_initialized("proxy");
        assert!(matches!(err, SlowGateError::NotInitialized { .. }));
        assert_eq!(err.to_string(), "Not initialized: proxy");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "config missing");
        assert!(matches!(
            SlowGateError::from(io_err),
            SlowGateError::NotFound { .. }
        ));

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(matches!(
            SlowGateError::from(io_err),
            SlowGateError::Storage { .. }
        ));
    }

    #[test]
    fn test_errors_roundtrip_through_json() {
        let err = SlowGateError::unauthorized("caller 0x01 may not write slot 7");
        let json = serde_json::to_string(&err).unwrap();
        let back: SlowGateError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
