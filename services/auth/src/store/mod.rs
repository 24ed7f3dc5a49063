//! Session storage
//!
//! The store is the single source of truth for "who is logged in". All
//! operations are atomic at the granularity of one token's record, and
//! expiry is enforced both lazily on read and by the backend's native TTL
//! where it has one.

mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Session;
use crate::token::SessionToken;

pub use self::memory::MemorySessionStore;
pub use self::redis::RedisSessionStore;

/// How many fresh tokens to try before declaring the entropy source broken.
/// With 256-bit tokens a single collision is already astronomically rare.
pub(crate) const MAX_CREATE_ATTEMPTS: u32 = 4;

/// Failures from session store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or timed out; transient
    #[error("session store unavailable")]
    Unavailable(#[source] common::error::CacheError),

    /// Token generation collided repeatedly; fatal configuration problem
    #[error("session token generation exhausted its retries")]
    CollisionExhausted,

    /// Record encoding fault; should never happen for well-formed sessions
    #[error("session record encoding error: {0}")]
    Encoding(#[source] serde_json::Error),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Creation, lookup, refresh and destruction of session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Issue a fresh unguessable token bound to `user_id`, valid for `ttl`.
    ///
    /// Implementations must regenerate on token collision rather than
    /// overwrite, and give up with [`StoreError::CollisionExhausted`] after
    /// a small fixed number of tries.
    async fn create(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> StoreResult<(SessionToken, DateTime<Utc>)>;

    /// Look up a live session; `None` for absent or expired tokens.
    ///
    /// A record found past its `expires_at` is deleted on the way out
    /// (lazy expiry) so it cannot be observed by later reads either.
    async fn get(&self, token: &SessionToken) -> StoreResult<Option<Session>>;

    /// Extend a live session's expiry to `new_ttl` from now.
    ///
    /// Returns `false` without side effects if the token is absent or
    /// already expired.
    async fn touch(&self, token: &SessionToken, new_ttl: Duration) -> StoreResult<bool>;

    /// Delete a session record. Idempotent: destroying an absent token
    /// returns `false`, never an error.
    async fn destroy(&self, token: &SessionToken) -> StoreResult<bool>;
}

/// Absolute expiry for a record created or touched now, saturating on
/// absurdly large TTLs
pub(crate) fn expiry_from_now(ttl: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// TTL in whole seconds for backends with second resolution, clamped to at
/// least 1 so a sub-second TTL still lands in the future
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
