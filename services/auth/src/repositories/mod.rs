//! Collaborator repositories consumed by the authentication core

pub mod user;

pub use user::{MemoryUserRepository, UserRepository};
