//! User repository interface
//!
//! The relational user store is an external collaborator; this crate only
//! consumes the lookup/create surface below. Emails are compared
//! case-insensitively, and the backing storage is assumed to enforce email
//! uniqueness. The in-memory implementation exists for tests and mirrors
//! those guarantees.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{NewUser, User};

/// Lookup and creation of user records
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by email, case-insensitively
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Create a new user; fails if the email is already taken
    async fn create(&self, new_user: NewUser) -> Result<User>;
}

/// In-memory user repository for tests and Redis-less runs
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let needle = email.to_lowercase();
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == needle).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let email = new_user.email.to_lowercase();
        let mut users = self.users.lock().await;

        if users.values().any(|u| u.email == email) {
            bail!("email already registered: {}", email);
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            display_name: new_user.display_name,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}
