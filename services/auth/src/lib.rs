//! Session-based authentication core
//!
//! This crate implements the engine behind login, signup, logout and
//! "who am I" flows: credential verification with Argon2id, a Redis-backed
//! session store with collision-safe token issuance and expiry, and a
//! `SessionService` orchestrating the two. Transport (HTTP, cookies) and
//! the relational user store are external collaborators; the service only
//! consumes the `UserRepository` interface and hands back tokens and
//! identities.

pub mod credentials;
pub mod error;
pub mod models;
pub mod repositories;
pub mod service;
pub mod store;
pub mod token;
pub mod validation;

pub use credentials::CredentialVerifier;
pub use error::{AuthError, AuthResult};
pub use service::{SessionConfig, SessionService};
pub use store::{MemorySessionStore, RedisSessionStore, SessionStore};
pub use token::SessionToken;
