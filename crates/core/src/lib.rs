//! Core types and shared functionality for the curalink offline agent.
//!
//! This crate provides:
//! - Cache Store implementation with SQLite backend
//! - Request and response data model
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;

pub use cache::{CacheDb, RequestKey, ResponseKind, ResponseSnapshot};
pub use config::{AppConfig, ConfigError, NotificationConfig};
pub use error::Error;
pub use request::InterceptedRequest;
