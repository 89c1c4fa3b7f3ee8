//! Error types for the cache client.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the cache client.
///
/// Errors are `Clone` because a single in-flight fetch settles once and the same
/// outcome is handed to every caller that joined it.
///
/// The client never wraps an error it receives: whatever the backend or the
/// registered fetcher returns is what the caller of `fetch` sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend storage error (Redis, in-memory, etc).
    ///
    /// Common causes:
    /// - Redis connection lost
    /// - Network timeout
    /// - Backend protocol error
    ///
    /// A failed `get` is never treated as a cache miss.
    BackendError(String),

    /// Backend was used while its connection is not open.
    ///
    /// Raised by backends when an operation is issued before `initialize()`
    /// completed or after `teardown()`.
    NotConnected(String),

    /// Error produced by a registered fetcher.
    ///
    /// Fetchers may return any variant; this one exists for fetchers that have
    /// no better fit.
    FetchError(String),

    /// `fetch` was called with a key that has no registered fetcher.
    UnknownKey(String),

    /// The fetcher for the given key panicked while it was being awaited.
    FetcherPanicked(String),

    /// Converting a fetched value into its raw store representation failed.
    SerializationError(String),

    /// Converting a raw cached string back into a value failed.
    DeserializationError(String),

    /// A per-key value processor rejected the raw cached value.
    ProcessorError(String),

    /// Operation exceeded configured timeout threshold.
    Timeout(String),

    /// Configuration error while building a backend or client.
    ///
    /// Common causes:
    /// - Invalid connection string
    /// - Missing required configuration
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::NotConnected(msg) => write!(f, "Not connected: {}", msg),
            Error::FetchError(msg) => write!(f, "Fetch error: {}", msg),
            Error::UnknownKey(key) => write!(f, "No fetcher registered for key: {}", key),
            Error::FetcherPanicked(key) => write!(f, "Fetcher panicked for key: {}", key),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::ProcessorError(msg) => write!(f, "Value processor error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}
