//! Custom error types for the common library
//!
//! This module defines the error type for the key-value backend so that
//! callers can tell transient unavailability apart from everything else.

use redis::RedisError;
use std::time::Duration;
use thiserror::Error;

/// Custom error type for key-value backend operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Error occurred while establishing a connection to the backend
    #[error("cache connection error: {0}")]
    Connection(#[source] RedisError),

    /// Error occurred while executing a command
    #[error("cache command error: {0}")]
    Command(#[source] RedisError),

    /// Operation did not complete within the configured timeout
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

impl CacheError {
    /// True for failures that are safe to retry with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            CacheError::Connection(_) | CacheError::Timeout(_) => true,
            CacheError::Command(e) => e.is_timeout() || e.is_connection_dropped(),
        }
    }
}

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
