//! Redis-backed session store
//!
//! Records are JSON under `session:{token}` with a native Redis TTL as the
//! expiry backstop. Creation uses `SET NX EX` so two concurrent creates can
//! never land on the same token, and touch uses `SET XX EX` so refreshing a
//! session is a single atomic write of the whole record.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use common::cache::RedisPool;

use crate::models::Session;
use crate::token::SessionToken;

use super::{MAX_CREATE_ATTEMPTS, SessionStore, StoreError, StoreResult, expiry_from_now,
            ttl_seconds};

/// Session store on top of the shared Redis pool
#[derive(Clone)]
pub struct RedisSessionStore {
    pool: RedisPool,
}

impl RedisSessionStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn session_key(token: &SessionToken) -> String {
        format!("session:{}", token.as_str())
    }

    fn encode(session: &Session) -> StoreResult<String> {
        serde_json::to_string(session).map_err(StoreError::Encoding)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> StoreResult<(SessionToken, DateTime<Utc>)> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let token = SessionToken::generate();
            let expires_at = expiry_from_now(ttl);
            let session = Session {
                user_id,
                created_at: Utc::now(),
                expires_at,
            };
            let record = Self::encode(&session)?;

            let written = self
                .pool
                .set_nx_ex(&Self::session_key(&token), &record, ttl_seconds(ttl))
                .await
                .map_err(StoreError::Unavailable)?;

            if written {
                info!("Created session for user: {}", user_id);
                return Ok((token, expires_at));
            }

            warn!("Session token collision, regenerating");
        }

        error!(
            "Session token generation collided {} times; entropy source suspect",
            MAX_CREATE_ATTEMPTS
        );
        Err(StoreError::CollisionExhausted)
    }

    async fn get(&self, token: &SessionToken) -> StoreResult<Option<Session>> {
        let key = Self::session_key(token);
        let Some(raw) = self.pool.get(&key).await.map_err(StoreError::Unavailable)? else {
            return Ok(None);
        };

        let session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                // Undecodable record: purge it and report a miss
                error!("Dropping undecodable session record: {}", e);
                self.pool.delete(&key).await.map_err(StoreError::Unavailable)?;
                return Ok(None);
            }
        };

        if session.is_expired(Utc::now()) {
            // Lazy expiry; Redis native TTL is the backstop
            self.pool.delete(&key).await.map_err(StoreError::Unavailable)?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn touch(&self, token: &SessionToken, new_ttl: Duration) -> StoreResult<bool> {
        let Some(mut session) = self.get(token).await? else {
            return Ok(false);
        };

        session.expires_at = expiry_from_now(new_ttl);
        let record = Self::encode(&session)?;

        // XX keeps this a no-op if the session vanished since the read
        let rewritten = self
            .pool
            .set_xx_ex(&Self::session_key(token), &record, ttl_seconds(new_ttl))
            .await
            .map_err(StoreError::Unavailable)?;

        Ok(rewritten)
    }

    async fn destroy(&self, token: &SessionToken) -> StoreResult<bool> {
        let removed = self
            .pool
            .delete(&Self::session_key(token))
            .await
            .map_err(StoreError::Unavailable)?;

        if removed {
            info!("Destroyed session");
        }
        Ok(removed)
    }
}
