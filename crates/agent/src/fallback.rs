//! Offline fallback for navigations that neither cache nor network can answer.

use curalink_core::{InterceptedRequest, RequestKey, ResponseSnapshot};

use crate::namespaces::NamespaceManager;

pub const OFFLINE_BODY: &str = "Offline - Please check your connection";

/// The fixed 503 page returned when not even the home page is cached.
pub fn offline_page() -> ResponseSnapshot {
    ResponseSnapshot::new(
        503,
        "Service Unavailable",
        vec![("Content-Type".to_string(), "text/html".to_string())],
        OFFLINE_BODY,
    )
}

/// Best-effort substitute: the cached home page of the request's origin, or
/// the offline page. Always produces a response.
pub async fn synthesize(namespaces: &NamespaceManager, request: &InterceptedRequest) -> ResponseSnapshot {
    let root = match request.url.join("/") {
        Ok(root) => RequestKey::get(&root),
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "cannot derive root url for offline fallback");
            return offline_page();
        }
    };

    match namespaces.lookup(&root).await {
        Ok(Some(home)) => {
            tracing::debug!(url = %request.url, "offline: serving cached home page");
            home
        }
        Ok(None) => offline_page(),
        Err(e) => {
            tracing::warn!(error = %e, "offline fallback lookup failed");
            offline_page()
        }
    }
}
