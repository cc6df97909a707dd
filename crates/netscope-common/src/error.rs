//! Error types for netscope

use thiserror::Error;

/// netscope error type
#[derive(Error, Debug)]
pub enum NetscopeError {
    /// A single-target request was missing a required field
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Attempt exceeded its deadline
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// Host name could not be resolved
    #[error("resolve error: {0}")]
    Resolve(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// TLS handshake failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for netscope
pub type NetscopeResult<T> = Result<T, NetscopeError>;
