//! Page-initiated requests as seen by the agent.

use url::Url;

/// A single intercepted fetch. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    /// HTTP method as issued by the page (`GET`, `POST`, ...).
    pub method: String,
    /// Absolute request URL.
    pub url: Url,
    /// `Accept` header, used only as a content-type hint.
    pub accept: Option<String>,
}

impl InterceptedRequest {
    pub fn new(method: impl Into<String>, url: Url, accept: Option<String>) -> Self {
        Self { method: method.into(), url, accept }
    }

    /// Shorthand for a GET with the given `Accept` value.
    pub fn get(url: Url, accept: &str) -> Self {
        Self::new("GET", url, Some(accept.to_string()))
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Substring test against the `Accept` header. A missing header matches nothing.
    pub fn accepts(&self, needle: &str) -> bool {
        self.accept.as_deref().is_some_and(|a| a.contains(needle))
    }
}
