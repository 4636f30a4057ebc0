//! Network side of the curalink offline agent.
//!
//! This crate provides the `Network` seam the agent fetches through, a
//! reqwest-backed implementation of it, and URL canonicalization for cache keys.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, canonicalize, resolve_path};
