//! SQLite-backed Cache Store holding named, versioned namespaces.
//!
//! This module provides a persistent request -> response map using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named namespaces created and deleted as a whole
//! - Keys derived from the normalized (method, URL) pair via SHA-256
//! - Wholesale overwrite of an entry on every insertion
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod namespaces;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{RequestKey, ResponseKind, ResponseSnapshot};
