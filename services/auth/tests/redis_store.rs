//! Contract tests for the Redis-backed session store
//!
//! These need a live server, so they are ignored by default; run with
//! `cargo test -- --ignored` against a local Redis.

use std::time::Duration;

use auth::store::{RedisSessionStore, SessionStore};
use auth::token::SessionToken;
use common::cache::{RedisConfig, RedisPool};
use uuid::Uuid;

fn store() -> RedisSessionStore {
    let pool = RedisPool::new(&RedisConfig::from_env()).expect("Redis client should initialize");
    RedisSessionStore::new(pool)
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn create_get_destroy_round_trip() {
    let store = store();
    let user_id = Uuid::new_v4();

    let (token, expires_at) = store.create(user_id, Duration::from_secs(30)).await.unwrap();

    let session = store.get(&token).await.unwrap().expect("session should exist");
    assert_eq!(session.user_id, user_id);
    assert_eq!(session.expires_at, expires_at);

    assert!(store.destroy(&token).await.unwrap());
    assert!(!store.destroy(&token).await.unwrap());
    assert!(store.get(&token).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn expired_session_reads_as_absent() {
    let store = store();
    let (token, _) = store
        .create(Uuid::new_v4(), Duration::from_secs(1))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(store.get(&token).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn touch_extends_a_live_session() {
    let store = store();
    let (token, original_expiry) = store
        .create(Uuid::new_v4(), Duration::from_secs(2))
        .await
        .unwrap();

    assert!(store.touch(&token, Duration::from_secs(60)).await.unwrap());

    let session = store.get(&token).await.unwrap().unwrap();
    assert!(session.expires_at > original_expiry);

    store.destroy(&token).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn touch_of_an_absent_token_is_refused() {
    let store = store();
    let missing = SessionToken::generate();
    assert!(!store.touch(&missing, Duration::from_secs(60)).await.unwrap());
}
