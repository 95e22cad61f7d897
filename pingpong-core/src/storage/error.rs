//! Storage errors.

use thiserror::Error;

/// Result alias for backend operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of a single backend operation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not open or keep a connection to the medium.
    #[error("connection error: {message}")]
    Connection {
        /// Details from the driver or filesystem
        message: String,
    },

    /// Reading the counter failed.
    #[error("read error: {message}")]
    Read {
        /// Details from the driver or filesystem
        message: String,
    },

    /// Writing the counter failed.
    #[error("write error: {message}")]
    Write {
        /// Details from the driver or filesystem
        message: String,
    },

    /// Creating the table/file or seeding the counter failed.
    #[error("schema error: {message}")]
    Schema {
        /// Details from the driver or filesystem
        message: String,
    },

    /// The operation did not finish in time.
    #[error("operation timed out after {ms}ms: {operation}")]
    Timeout {
        /// What was running
        operation: &'static str,
        /// Configured limit
        ms: u64,
    },

    /// Anything else, e.g. a value the medium should never hold.
    #[error("internal error: {message}")]
    Internal {
        /// Details
        message: String,
    },
}

impl StorageError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a read error.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    /// Create a write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for failures to reach the medium at all.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_message() {
        let err = StorageError::write("disk full");
        assert_eq!(err.to_string(), "write error: disk full");
        assert!(!err.is_connection());
    }

    #[test]
    fn test_timeout_display() {
        let err = StorageError::Timeout {
            operation: "increment",
            ms: 5000,
        };
        assert_eq!(err.to_string(), "operation timed out after 5000ms: increment");
    }
}
