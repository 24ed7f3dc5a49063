//! Session orchestration
//!
//! `SessionService` wires the credential verifier, the session store and the
//! user repository into the login/signup/authenticate/logout operations. It
//! holds no mutable state of its own; the store is the single source of
//! truth for who is logged in, so the service can be cloned freely across
//! request handlers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task;
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::credentials::{CredentialError, CredentialVerifier};
use crate::error::{AuthError, AuthResult};
use crate::models::{NewUser, UserProfile};
use crate::repositories::UserRepository;
use crate::store::{SessionStore, StoreError, StoreResult};
use crate::token::SessionToken;
use crate::validation::{validate_display_name, validate_email, validate_password};

/// Total attempts per store operation, counting the first
const STORE_ATTEMPTS: u32 = 3;
/// Backoff before the first retry; doubles per attempt
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Session lifecycle policy
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session time-to-live
    pub ttl: Duration,
    /// Sliding expiration: reset the TTL on each successful authenticate.
    /// Fixed expiration (false) never extends the original deadline.
    pub sliding: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(86_400),
            sliding: true,
        }
    }
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_TTL_SECS`: session time-to-live in seconds (default: 86400)
    /// - `SESSION_SLIDING`: "true"/"false", sliding vs fixed expiration
    ///   (default: true)
    pub fn from_env() -> Self {
        let ttl_secs = std::env::var("SESSION_TTL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86_400);
        let sliding = std::env::var("SESSION_SLIDING")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        SessionConfig {
            ttl: Duration::from_secs(ttl_secs),
            sliding,
        }
    }
}

/// Orchestrates credential verification and session lifecycle
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    users: Arc<dyn UserRepository>,
    verifier: CredentialVerifier,
    config: SessionConfig,
}

impl SessionService {
    /// Create a service with injected collaborators
    pub fn new(
        store: Arc<dyn SessionStore>,
        users: Arc<dyn UserRepository>,
        verifier: CredentialVerifier,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            users,
            verifier,
            config,
        }
    }

    /// Register a new user and return the exposable projection
    pub async fn signup(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> AuthResult<UserProfile> {
        // Validate the same forms that get stored
        let display_name = display_name.trim();
        validate_email(email.trim()).map_err(AuthError::InvalidInput)?;
        validate_display_name(display_name).map_err(AuthError::InvalidInput)?;
        validate_password(password).map_err(AuthError::InvalidInput)?;

        let email = email.trim().to_lowercase();
        let existing = self
            .users
            .find_by_email(&email)
            .await
            .map_err(AuthError::Repository)?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_blocking(password.to_string()).await?;
        let created = self
            .users
            .create(NewUser {
                email: email.clone(),
                display_name: display_name.to_string(),
                password_hash,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            Err(e) => {
                // The storage layer enforces email uniqueness, so a create
                // that fails after our pre-check may have lost a race with
                // a concurrent signup for the same address
                let raced = self
                    .users
                    .find_by_email(&email)
                    .await
                    .map_err(AuthError::Repository)?;
                if raced.is_some() {
                    return Err(AuthError::EmailTaken);
                }
                return Err(AuthError::Repository(e));
            }
        };

        info!("Created user: {}", user.id);
        Ok(UserProfile::from(&user))
    }

    /// Verify credentials and issue a session
    ///
    /// Unknown email and wrong password both come back as
    /// [`AuthError::InvalidCredentials`]; the unknown-email path burns a
    /// verification against a dummy hash so the two take similar time.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<(SessionToken, DateTime<Utc>)> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(AuthError::Repository)?;

        let Some(user) = user else {
            let verifier = self.verifier.clone();
            let password = password.to_string();
            task::spawn_blocking(move || {
                let dummy = verifier.dummy_hash();
                let _ = verifier.verify(&dummy, &password);
            })
            .await
            .ok();
            info!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let verified = self
            .verify_blocking(user.password_hash.clone(), password.to_string())
            .await?;
        if !verified {
            info!("Login rejected for user: {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        // The session is issued only after verification has fully
        // completed, so a login cancelled mid-flight cannot leave an
        // orphaned session behind
        let (token, expires_at) =
            with_store_retry(|| self.store.create(user.id, self.config.ttl)).await?;
        info!("Login succeeded for user: {}", user.id);
        Ok((token, expires_at))
    }

    /// Resolve a token to the user it is bound to
    ///
    /// Under the sliding policy a successful authenticate also extends the
    /// session's expiry; expired and destroyed sessions are both
    /// [`AuthError::NoSession`].
    pub async fn authenticate(&self, token: &SessionToken) -> AuthResult<Uuid> {
        let session = with_store_retry(|| self.store.get(token)).await?;
        let Some(session) = session else {
            return Err(AuthError::NoSession);
        };

        if self.config.sliding {
            // Best-effort: the caller is already authenticated against the
            // store, so a failed extension only shortens the session
            match self.store.touch(token, self.config.ttl).await {
                Ok(_) => {}
                Err(e) => warn!("Failed to extend session on use: {}", e),
            }
        }

        Ok(session.user_id)
    }

    /// Resolve a token to the exposable profile of its user
    pub async fn current_user(&self, token: &SessionToken) -> AuthResult<UserProfile> {
        let user_id = self.authenticate(token).await?;
        let user = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(AuthError::Repository)?;

        match user {
            Some(user) => Ok(UserProfile::from(&user)),
            None => {
                // The user vanished out-of-band; present it as an ordinary
                // unauthenticated state
                warn!("Session bound to unknown user: {}", user_id);
                Err(AuthError::NoSession)
            }
        }
    }

    /// Destroy the session for a token
    ///
    /// Idempotent: logging out an absent or expired token is a success.
    pub async fn logout(&self, token: &SessionToken) -> AuthResult<()> {
        let destroyed = with_store_retry(|| self.store.destroy(token)).await?;
        if destroyed {
            info!("Session destroyed on logout");
        }
        Ok(())
    }

    /// Hash a password on the blocking pool
    async fn hash_blocking(&self, password: String) -> AuthResult<String> {
        let verifier = self.verifier.clone();
        let hashed = task::spawn_blocking(move || verifier.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(anyhow::Error::new(e)))?;

        hashed.map_err(|e| AuthError::Internal(anyhow::Error::new(e)))
    }

    /// Verify a password on the blocking pool
    async fn verify_blocking(&self, hash: String, password: String) -> AuthResult<bool> {
        let verifier = self.verifier.clone();
        let verified = task::spawn_blocking(move || verifier.verify(&hash, &password))
            .await
            .map_err(|e| AuthError::Internal(anyhow::Error::new(e)))?;

        match verified {
            Ok(matches) => Ok(matches),
            Err(CredentialError::MalformedHash) => {
                error!("Stored credential failed to decode");
                Err(AuthError::CorruptCredential)
            }
            Err(CredentialError::Hashing(msg)) => Err(AuthError::Internal(anyhow::anyhow!(msg))),
        }
    }
}

/// Run a store operation with bounded retries on transient unavailability.
/// Only [`StoreError::Unavailable`] is retried; everything else propagates
/// on the first attempt.
async fn with_store_retry<T, F, Fut>(mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match op().await {
            Err(StoreError::Unavailable(e)) if attempt < STORE_ATTEMPTS => {
                warn!(
                    "Session store unavailable (attempt {}/{}): {}",
                    attempt, STORE_ATTEMPTS, e
                );
                sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_session_config_from_env() {
        unsafe {
            std::env::set_var("SESSION_TTL_SECS", "120");
            std::env::set_var("SESSION_SLIDING", "false");
        }

        let config = SessionConfig::from_env();
        assert_eq!(config.ttl, Duration::from_secs(120));
        assert!(!config.sliding);

        unsafe {
            std::env::remove_var("SESSION_TTL_SECS");
            std::env::remove_var("SESSION_SLIDING");
        }
    }

    #[test]
    #[serial]
    fn test_session_config_defaults() {
        let config = SessionConfig::from_env();
        assert_eq!(config.ttl, Duration::from_secs(86_400));
        assert!(config.sliding);
    }
}
