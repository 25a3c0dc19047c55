//! Error types for Echomark

use thiserror::Error;

/// Result type alias for identification operations
pub type Result<T> = std::result::Result<T, Error>;

/// Identification error types
#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transform contract violated: length {len} is not a power of two")]
    NonPowerOfTwo { len: usize },

    // Catalog errors
    #[error("Catalog store unavailable: {0}")]
    StoreUnavailable(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Error::StoreUnavailable(msg.into())
    }

    /// Create an input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Returns true if the caller may retry the operation
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::Io(_))
    }

    /// Returns a stable error code for logs and API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::NonPowerOfTwo { .. } => "NON_POWER_OF_TWO",
            Error::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
            Error::Io(_) => "IO",
            Error::Serialization(_) => "SERIALIZATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_recoverable() {
        assert!(Error::store("connection reset").is_recoverable());
        assert!(!Error::NonPowerOfTwo { len: 1000 }.is_recoverable());
        assert!(!Error::invalid_input("empty buffer").is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NonPowerOfTwo { len: 3 }.error_code(), "NON_POWER_OF_TWO");
        assert_eq!(Error::store("down").error_code(), "STORE_UNAVAILABLE");
        assert_eq!(
            Error::InvalidConfig("hop".into()).error_code(),
            "INVALID_CONFIG"
        );
    }

    #[test]
    fn test_contract_violation_message() {
        let msg = Error::NonPowerOfTwo { len: 1000 }.to_string();
        assert!(msg.contains("contract"));
        assert!(msg.contains("1000"));
    }
}
