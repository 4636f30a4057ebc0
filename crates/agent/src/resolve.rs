//! Resolution Engine.
//!
//! For every intercepted request that is not excluded:
//!
//! 1. Look the request up in runtime, then core.
//! 2. On a hit, answer from cache. Navigations also start a background
//!    refresh that overwrites the runtime entry on a 200.
//! 3. On a miss, go to the network. A 200 for a cacheable category is copied
//!    into the runtime namespace while the original goes back to the page.
//!    Any other status is passed through and never stored. A failed fetch
//!    becomes the offline page for navigations and no response otherwise.
//!
//! Excluded and non-GET requests resolve to no response without touching the
//! network or the cache.
//!
//! Cache writes and refreshes run under the caller's `ExtendedLifetime`; the
//! response is returned without waiting for them.

use std::sync::Arc;

use curalink_client::Network;
use curalink_core::{InterceptedRequest, RequestKey, ResponseSnapshot};

use crate::classify::Classification;
use crate::fallback;
use crate::lifetime::ExtendedLifetime;
use crate::namespaces::NamespaceManager;

/// What the page receives, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Cache(ResponseSnapshot),
    Network(ResponseSnapshot),
    Offline(ResponseSnapshot),
    /// No response at all; the page sees a failed load.
    Unresolved,
}

impl Resolution {
    pub fn response(&self) -> Option<&ResponseSnapshot> {
        match self {
            Resolution::Cache(r) | Resolution::Network(r) | Resolution::Offline(r) => Some(r),
            Resolution::Unresolved => None,
        }
    }

    pub fn into_response(self) -> Option<ResponseSnapshot> {
        match self {
            Resolution::Cache(r) | Resolution::Network(r) | Resolution::Offline(r) => Some(r),
            Resolution::Unresolved => None,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Resolution::Cache(_) => "cache",
            Resolution::Network(_) => "network",
            Resolution::Offline(_) => "offline",
            Resolution::Unresolved => "unresolved",
        }
    }
}

#[derive(Clone)]
pub struct ResolutionEngine {
    namespaces: NamespaceManager,
    network: Arc<dyn Network>,
}

impl ResolutionEngine {
    pub fn new(namespaces: NamespaceManager, network: Arc<dyn Network>) -> Self {
        Self { namespaces, network }
    }

    pub fn namespaces(&self) -> &NamespaceManager {
        &self.namespaces
    }

    pub async fn resolve(
        &self, request: &InterceptedRequest, classification: Classification, lifetime: &ExtendedLifetime,
    ) -> Resolution {
        let key = match RequestKey::new(&request.method, &request.url) {
            Ok(key) if classification != Classification::Excluded => key,
            _ => {
                tracing::warn!(url = %request.url, method = %request.method, "refusing to resolve an excluded request");
                return Resolution::Unresolved;
            }
        };

        match self.namespaces.lookup(&key).await {
            Ok(Some(cached)) => {
                if classification.refreshes_on_hit() {
                    self.revalidate(request.clone(), key, lifetime);
                }
                return Resolution::Cache(cached);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "cache lookup failed; treating as miss"),
        }

        let response = match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %request.url, ?classification, error = %e, "network fetch failed");
                if classification.has_offline_fallback() {
                    return Resolution::Offline(fallback::synthesize(&self.namespaces, request).await);
                }
                return Resolution::Unresolved;
            }
        };

        if !response.is_cacheable() {
            tracing::debug!(
                url = %request.url,
                status = response.status,
                kind = response.kind.as_str(),
                "passing through uncacheable response"
            );
            return Resolution::Network(response);
        }

        if classification.is_cacheable() {
            self.store(key, response.clone(), lifetime);
        }

        Resolution::Network(response)
    }

    /// Write `response` into the runtime namespace in the background.
    fn store(&self, key: RequestKey, response: ResponseSnapshot, lifetime: &ExtendedLifetime) {
        let namespaces = self.namespaces.clone();
        lifetime.wait_until(async move {
            match namespaces.put_runtime(&key, &response).await {
                Ok(()) => tracing::debug!(key = %key, "stored in runtime namespace"),
                Err(e) => tracing::warn!(key = %key, error = %e, "runtime cache write failed"),
            }
        });
    }

    /// Stale-while-revalidate: refresh the runtime entry for the next request.
    fn revalidate(&self, request: InterceptedRequest, key: RequestKey, lifetime: &ExtendedLifetime) {
        let engine = self.clone();
        lifetime.wait_until(async move {
            match engine.network.fetch(&request).await {
                Ok(fresh) if fresh.is_cacheable() => {
                    if let Err(e) = engine.namespaces.put_runtime(&key, &fresh).await {
                        tracing::warn!(key = %key, error = %e, "refresh write failed");
                    } else {
                        tracing::debug!(key = %key, "refreshed runtime entry");
                    }
                }
                Ok(other) => tracing::debug!(key = %key, status = other.status, "refresh not cacheable; keeping entry"),
                Err(e) => tracing::debug!(key = %key, error = %e, "background refresh failed; keeping entry"),
            }
        });
    }
}
