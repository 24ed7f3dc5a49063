//! Common library for the session authentication workspace
//!
//! This crate provides the key-value backend adapter shared by the services:
//! Redis connectivity, the operations the session store needs, and the
//! cache error taxonomy.

pub mod cache;
pub mod error;
