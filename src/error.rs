//! Error types for cache and rate-limiter operations
//!
//! Store failures are surfaced as-is; nothing in this crate retries or
//! substitutes a fallback value unless the caller configured it to.

use thiserror::Error;

/// Main error type for key-value store, cache and rate-limiter operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Connection error - the store could not be reached
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout_ms}ms: {context}")]
    TimeoutError { timeout_ms: u64, context: String },

    /// The store answered, but with an error (e.g. INCR on a non-integer)
    #[error("Store error: {0}")]
    StoreError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Another caller's coalesced fetch for the same key failed
    #[error("Coalesced fetch failed for key: {key}")]
    CoalescedFetchFailed { key: String },

    /// Redis driver error (wrapper)
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// HTTP transport error from the REST store client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl CacheError {
    /// Whether the error means the store itself is unavailable, as opposed to
    /// a bad payload or a bad request.
    pub fn is_unavailable(&self) -> bool {
        match self {
            CacheError::ConnectionError(_) | CacheError::TimeoutError { .. } => true,
            CacheError::Redis(e) => e.is_io_error() || e.is_connection_dropped() || e.is_timeout(),
            CacheError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}
