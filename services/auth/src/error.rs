//! Error taxonomy for the authentication core
//!
//! Callers are expected to map these onto their transport's status codes.
//! `InvalidCredentials` deliberately covers both "no such user" and "wrong
//! password" so the two are indistinguishable, and `NoSession` covers both
//! expired and explicitly destroyed sessions.

use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced by [`crate::service::SessionService`]
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are intentionally
    /// indistinguishable to resist user enumeration
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No active session for the presented token (expired, destroyed or
    /// never issued)
    #[error("no active session")]
    NoSession,

    /// Signup rejected because the email is already registered
    #[error("email is already registered")]
    EmailTaken,

    /// Signup input failed validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The session store could not be reached; transient, safe to retry
    /// with backoff
    #[error("session store unavailable")]
    StoreUnavailable(#[source] common::error::CacheError),

    /// A stored password hash could not be decoded; data integrity issue,
    /// non-retryable, should be alerted on
    #[error("stored credential is corrupt")]
    CorruptCredential,

    /// Token generation kept colliding; indicates a broken entropy source
    /// or misconfiguration, not a user-facing condition
    #[error("session token generation exhausted its retries")]
    CollisionExhausted,

    /// The user repository collaborator failed
    #[error("user repository error")]
    Repository(#[source] anyhow::Error),

    /// Unexpected internal fault (e.g. a hashing task that could not be
    /// joined)
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(e) => AuthError::StoreUnavailable(e),
            StoreError::CollisionExhausted => AuthError::CollisionExhausted,
            StoreError::Encoding(e) => AuthError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Type alias for Result with AuthError
pub type AuthResult<T> = Result<T, AuthError>;
