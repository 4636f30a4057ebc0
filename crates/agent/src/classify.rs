//! Request classification.
//!
//! Decides whether an intercepted request is handled at all and, if so, which
//! content category it belongs to. Classification has no side effects, so the
//! read path (refresh strategy) and the write path (cacheability) always agree.

use curalink_core::{AppConfig, ConfigError, InterceptedRequest};
use regex::Regex;

/// Outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not intercepted; the request goes to the network untouched.
    Excluded,
    /// Full-page HTML load.
    Navigational,
    /// Anything under the static prefix.
    StaticAsset,
    Stylesheet,
    Script,
    Other,
}

impl Classification {
    /// Whether a successful network response may be written to the runtime namespace.
    pub fn is_cacheable(self) -> bool {
        matches!(
            self,
            Classification::StaticAsset
                | Classification::Navigational
                | Classification::Stylesheet
                | Classification::Script
        )
    }

    /// Whether a cache hit also triggers a background refresh.
    pub fn refreshes_on_hit(self) -> bool {
        self == Classification::Navigational
    }

    /// Whether a total miss falls back to the offline page.
    pub fn has_offline_fallback(self) -> bool {
        self == Classification::Navigational
    }
}

/// Path and content-type rules, built once from configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    static_prefix: String,
    admin_prefix: String,
    api_prefix: String,
    logout: Regex,
}

impl Classifier {
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        let logout = Regex::new(&config.logout_pattern).map_err(|e| ConfigError::Invalid {
            field: "logout_pattern".into(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            static_prefix: config.static_prefix.clone(),
            admin_prefix: config.admin_prefix.clone(),
            api_prefix: config.api_prefix.clone(),
            logout,
        })
    }

    /// Whether the request is left alone entirely.
    pub fn is_excluded(&self, request: &InterceptedRequest) -> bool {
        if !request.is_get() {
            return true;
        }
        let path = request.path();
        path.starts_with(&self.admin_prefix) || path.starts_with(&self.api_prefix) || self.logout.is_match(path)
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Classification {
        if self.is_excluded(request) {
            return Classification::Excluded;
        }

        if request.path().starts_with(&self.static_prefix) {
            Classification::StaticAsset
        } else if request.accepts("text/html") {
            Classification::Navigational
        } else if request.accepts("text/css") {
            Classification::Stylesheet
        } else if request.accepts("application/javascript") || request.accepts("text/javascript") {
            Classification::Script
        } else {
            Classification::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn classifier() -> Classifier {
        Classifier::new(&AppConfig::default()).unwrap()
    }

    fn get(path: &str, accept: &str) -> InterceptedRequest {
        let url = Url::parse("http://localhost:8000").unwrap().join(path).unwrap();
        InterceptedRequest::get(url, accept)
    }

    #[test]
    fn test_non_get_excluded() {
        let url = Url::parse("http://localhost:8000/appointments/book/").unwrap();
        let post = InterceptedRequest::new("POST", url, Some("text/html".into()));
        assert_eq!(classifier().classify(&post), Classification::Excluded);
    }

    #[test]
    fn test_admin_api_logout_excluded() {
        let c = classifier();
        assert_eq!(c.classify(&get("/admin/", "text/html")), Classification::Excluded);
        assert_eq!(c.classify(&get("/api/patients/1", "application/json")), Classification::Excluded);
        assert_eq!(c.classify(&get("/accounts/logout/", "text/html")), Classification::Excluded);
        assert_eq!(c.classify(&get("/en/accounts/logout/", "text/html")), Classification::Excluded);
    }

    #[test]
    fn test_prefix_must_match_at_start() {
        let c = classifier();
        assert_eq!(c.classify(&get("/hospitals/api/", "text/html")), Classification::Navigational);
        assert_eq!(c.classify(&get("/administer", "text/html")), Classification::Navigational);
    }

    #[test]
    fn test_static_prefix_wins_over_accept() {
        let c = classifier();
        assert_eq!(c.classify(&get("/static/logo.png", "image/png")), Classification::StaticAsset);
        assert_eq!(c.classify(&get("/static/css/main.css", "text/css")), Classification::StaticAsset);
    }

    #[test]
    fn test_accept_categories() {
        let c = classifier();
        assert_eq!(
            c.classify(&get("/", "text/html,application/xhtml+xml,*/*;q=0.8")),
            Classification::Navigational
        );
        assert_eq!(c.classify(&get("/theme.css", "text/css,*/*;q=0.1")), Classification::Stylesheet);
        assert_eq!(c.classify(&get("/bundle.js", "application/javascript")), Classification::Script);
        assert_eq!(c.classify(&get("/favicon.ico", "image/*")), Classification::Other);
    }

    #[test]
    fn test_missing_accept_is_other() {
        let url = Url::parse("http://localhost:8000/hospitals/").unwrap();
        let req = InterceptedRequest::new("GET", url, None);
        assert_eq!(classifier().classify(&req), Classification::Other);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        let req = get("/symptoms/", "text/html");
        assert_eq!(c.classify(&req), c.classify(&req));
    }

    #[test]
    fn test_policy_flags() {
        assert!(Classification::StaticAsset.is_cacheable());
        assert!(Classification::Script.is_cacheable());
        assert!(!Classification::Other.is_cacheable());
        assert!(!Classification::Excluded.is_cacheable());
        assert!(Classification::Navigational.refreshes_on_hit());
        assert!(!Classification::StaticAsset.refreshes_on_hit());
    }

    #[test]
    fn test_custom_logout_pattern() {
        let config = AppConfig { logout_pattern: r"/(logout|signout)/?$".into(), ..Default::default() };
        let c = Classifier::new(&config).unwrap();
        assert_eq!(c.classify(&get("/accounts/signout", "text/html")), Classification::Excluded);
        assert_eq!(c.classify(&get("/accounts/profile/", "text/html")), Classification::Navigational);
    }
}
