//! Request interception and cache resolution for the curalink offline agent.
//!
//! This crate provides:
//! - Request classification (what is intercepted, and as what)
//! - The two-namespace cache manager and lifecycle (install, activate)
//! - The resolution engine: cache, network, background refresh, offline page
//! - Push, notification and sync handlers
//! - The `Host` seam for outbound host primitives

pub mod agent;
pub mod classify;
pub mod events;
pub mod fallback;
pub mod host;
pub mod lifecycle;
pub mod lifetime;
pub mod namespaces;
pub mod resolve;

#[cfg(test)]
mod testing;

pub use agent::{FetchOutcome, ServiceAgent};
pub use classify::{Classification, Classifier};
pub use host::{Host, Notification, NotificationAction};
pub use lifecycle::{ActivationReport, LifecycleController, LifecycleState};
pub use lifetime::{ExtendedLifetime, LifetimeReport};
pub use namespaces::{NamespaceManager, Role};
pub use resolve::{Resolution, ResolutionEngine};
