//! In-memory session store
//!
//! Same contract as the Redis store, backed by a mutex-guarded map. There
//! is no background sweeper; expiry is enforced lazily on read, which is
//! enough for the tests and embedded uses this store exists for.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::models::Session;
use crate::token::SessionToken;

use super::{MAX_CREATE_ATTEMPTS, SessionStore, StoreError, StoreResult, expiry_from_now};

/// Session store over a mutex-guarded map, for tests and Redis-less runs
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) sessions currently held
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        let sessions = self.sessions.lock().await;
        sessions.values().filter(|s| !s.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> StoreResult<(SessionToken, DateTime<Utc>)> {
        let mut sessions = self.sessions.lock().await;

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let token = SessionToken::generate();
            if sessions.contains_key(token.as_str()) {
                warn!("Session token collision, regenerating");
                continue;
            }

            let expires_at = expiry_from_now(ttl);
            sessions.insert(
                token.as_str().to_string(),
                Session {
                    user_id,
                    created_at: Utc::now(),
                    expires_at,
                },
            );
            return Ok((token, expires_at));
        }

        Err(StoreError::CollisionExhausted)
    }

    async fn get(&self, token: &SessionToken) -> StoreResult<Option<Session>> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get(token.as_str()).cloned() else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            // Lazy expiry: drop the stale record on the way out
            sessions.remove(token.as_str());
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn touch(&self, token: &SessionToken, new_ttl: Duration) -> StoreResult<bool> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();

        let expired = match sessions.get(token.as_str()) {
            None => return Ok(false),
            Some(session) => session.is_expired(now),
        };
        if expired {
            sessions.remove(token.as_str());
            return Ok(false);
        }

        if let Some(session) = sessions.get_mut(token.as_str()) {
            session.expires_at = expiry_from_now(new_ttl);
        }
        Ok(true)
    }

    async fn destroy(&self, token: &SessionToken) -> StoreResult<bool> {
        let mut sessions = self.sessions.lock().await;
        Ok(sessions.remove(token.as_str()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_returns_the_binding() {
        let store = MemorySessionStore::new();
        let user_id = Uuid::new_v4();

        let (token, expires_at) = store
            .create(user_id, Duration::from_secs(60))
            .await
            .unwrap();
        let session = store.get(&token).await.unwrap().unwrap();

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.expires_at, expires_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn get_of_an_unknown_token_is_none() {
        let store = MemorySessionStore::new();
        let missing = SessionToken::generate();
        assert!(store.get(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_session_reads_as_absent_and_is_purged() {
        let store = MemorySessionStore::new();
        let (token, _) = store
            .create(Uuid::new_v4(), Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(store.get(&token).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn touch_extends_a_live_session() {
        let store = MemorySessionStore::new();
        let (token, original_expiry) = store
            .create(Uuid::new_v4(), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(store.touch(&token, Duration::from_secs(3600)).await.unwrap());

        let session = store.get(&token).await.unwrap().unwrap();
        assert!(session.expires_at > original_expiry);
    }

    #[tokio::test]
    async fn touch_of_an_expired_session_is_a_refused_noop() {
        let store = MemorySessionStore::new();
        let (token, _) = store
            .create(Uuid::new_v4(), Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!store.touch(&token, Duration::from_secs(60)).await.unwrap());
        assert!(store.get(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let store = MemorySessionStore::new();
        let (token, _) = store
            .create(Uuid::new_v4(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.destroy(&token).await.unwrap());
        assert!(!store.destroy(&token).await.unwrap());
        assert!(store.get(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_creates_issue_distinct_tokens() {
        let store = MemorySessionStore::new();
        let user_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(user_id, Duration::from_secs(60)).await
            }));
        }

        let mut tokens = std::collections::HashSet::new();
        for handle in handles {
            let (token, _) = handle.await.unwrap().unwrap();
            tokens.insert(token.as_str().to_string());
        }

        assert_eq!(tokens.len(), 32);
        assert_eq!(store.len().await, 32);
    }
}
