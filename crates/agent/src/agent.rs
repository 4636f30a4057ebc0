//! The agent: one entry point per trigger event.

use std::sync::Arc;

use curalink_client::Network;
use curalink_core::{AppConfig, CacheDb, Error, InterceptedRequest, NotificationConfig};
use tokio::sync::{Mutex, watch};

use crate::classify::{Classification, Classifier};
use crate::events;
use crate::host::Host;
use crate::lifecycle::{ActivationReport, LifecycleController, LifecycleState};
use crate::lifetime::ExtendedLifetime;
use crate::namespaces::NamespaceManager;
use crate::resolve::{Resolution, ResolutionEngine};

/// What happened to an intercepted fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request itself.
    PassThrough,
    Respond(Resolution),
}

pub struct ServiceAgent {
    classifier: Classifier,
    engine: ResolutionEngine,
    lifecycle: Mutex<LifecycleController>,
    /// Mirror of the controller's state, readable while an install holds the lock.
    state: watch::Sender<LifecycleState>,
    host: Arc<dyn Host>,
    notifications: NotificationConfig,
    sync_tag: String,
}

impl ServiceAgent {
    pub fn new(
        config: &AppConfig, db: CacheDb, network: Arc<dyn Network>, host: Arc<dyn Host>,
    ) -> Result<Self, Error> {
        let classifier = Classifier::new(config).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let namespaces = NamespaceManager::from_config(db, config);
        let lifecycle =
            LifecycleController::new(namespaces.clone(), network.clone(), &origin, &config.precache_urls)?;
        let (state, _) = watch::channel(lifecycle.state());

        Ok(Self {
            classifier,
            engine: ResolutionEngine::new(namespaces, network),
            lifecycle: Mutex::new(lifecycle),
            state,
            host,
            notifications: config.notifications.clone(),
            sync_tag: config.sync_tag.clone(),
        })
    }

    pub fn namespaces(&self) -> &NamespaceManager {
        self.engine.namespaces()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub async fn install(&self) -> Result<(), Error> {
        let mut lifecycle = self.lifecycle.lock().await;
        let result = lifecycle.install(self.host.as_ref()).await;
        self.state.send_replace(lifecycle.state());
        result
    }

    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let mut lifecycle = self.lifecycle.lock().await;
        let result = lifecycle.activate(self.host.as_ref()).await;
        self.state.send_replace(lifecycle.state());
        result
    }

    /// A newer agent has taken over; stop intercepting.
    pub async fn supersede(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.supersede();
        self.state.send_replace(lifecycle.state());
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Classification {
        self.classifier.classify(request)
    }

    /// Pages are only controlled once the agent is active. Before that, and
    /// for excluded requests, the fetch passes through and touches no cache.
    pub async fn handle_fetch(&self, request: &InterceptedRequest, lifetime: &ExtendedLifetime) -> FetchOutcome {
        let state = self.state();
        if state != LifecycleState::Active {
            tracing::debug!(url = %request.url, ?state, "not controlling pages yet");
            return FetchOutcome::PassThrough;
        }

        let classification = self.classify(request);
        if classification == Classification::Excluded {
            tracing::debug!(url = %request.url, method = %request.method, "not intercepted");
            return FetchOutcome::PassThrough;
        }

        let resolution = self.engine.resolve(request, classification, lifetime).await;
        tracing::debug!(url = %request.url, ?classification, source = resolution.source(), "resolved");
        FetchOutcome::Respond(resolution)
    }

    pub async fn handle_push(&self, data: Option<&str>) -> Result<(), Error> {
        events::handle_push(self.host.as_ref(), data, &self.notifications).await
    }

    pub async fn handle_notification_click(&self, action: &str, data: &str) -> Result<(), Error> {
        events::handle_notification_click(self.host.as_ref(), action, data).await
    }

    pub fn handle_sync(&self, tag: &str, lifetime: &ExtendedLifetime) -> bool {
        events::handle_sync(tag, &self.sync_tag, lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::Role;
    use crate::testing::{RecordingHost, ScriptedNetwork, ok};
    use curalink_core::{RequestKey, ResponseSnapshot};
    use url::Url;

    async fn agent() -> (ServiceAgent, Arc<ScriptedNetwork>, Arc<RecordingHost>) {
        let network = Arc::new(ScriptedNetwork::new());
        let host = Arc::new(RecordingHost::default());
        let db = CacheDb::open_in_memory().await.unwrap();
        let agent = ServiceAgent::new(&AppConfig::default(), db, network.clone(), host.clone()).unwrap();
        (agent, network, host)
    }

    /// Installed and activated, with the pre-cache fetches already spent.
    async fn active_agent() -> (ServiceAgent, Arc<ScriptedNetwork>, Arc<RecordingHost>) {
        let (agent, network, host) = agent().await;
        network.respond(url("/").as_str(), ok("<h1>CuraLink</h1>"));
        network.respond(url("/static/manifest.json").as_str(), ok("{}"));
        agent.install().await.unwrap();
        agent.activate().await.unwrap();
        (agent, network, host)
    }

    fn url(path: &str) -> Url {
        Url::parse("http://localhost:8000").unwrap().join(path).unwrap()
    }

    fn logo() -> ResponseSnapshot {
        ResponseSnapshot::new(200, "OK", vec![("Content-Type".into(), "image/png".into())], vec![0x89, b'P'])
    }

    #[tokio::test]
    async fn test_api_request_bypasses_cache() {
        let (agent, network, _host) = active_agent().await;
        let before = network.calls().len();
        let key = RequestKey::get(&url("/api/patients/1"));
        agent.namespaces().put_runtime(&key, &ok("cached json")).await.unwrap();

        let lifetime = ExtendedLifetime::new();
        let request = InterceptedRequest::get(url("/api/patients/1"), "application/json");
        let outcome = agent.handle_fetch(&request, &lifetime).await;

        assert_eq!(outcome, FetchOutcome::PassThrough);
        assert_eq!(network.calls().len(), before);
        assert_eq!(lifetime.pending(), 0);
    }

    #[tokio::test]
    async fn test_non_get_not_intercepted() {
        let (agent, network, _host) = active_agent().await;
        let before = network.calls().len();
        let lifetime = ExtendedLifetime::new();
        let request = InterceptedRequest::new("POST", url("/appointments/book/"), Some("text/html".into()));

        assert_eq!(agent.handle_fetch(&request, &lifetime).await, FetchOutcome::PassThrough);
        assert_eq!(network.calls().len(), before);
        assert!(agent.namespaces().keys(Role::Runtime).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logout_not_intercepted() {
        let (agent, _network, _host) = active_agent().await;
        let lifetime = ExtendedLifetime::new();
        let request = InterceptedRequest::get(url("/accounts/logout/"), "text/html");
        assert_eq!(agent.handle_fetch(&request, &lifetime).await, FetchOutcome::PassThrough);
    }

    #[tokio::test]
    async fn test_installing_agent_does_not_intercept() {
        let (agent, network, _host) = agent().await;
        network.respond(url("/static/logo.png").as_str(), logo());
        assert_eq!(agent.state(), LifecycleState::Installing);

        let lifetime = ExtendedLifetime::new();
        let request = InterceptedRequest::get(url("/static/logo.png"), "image/png");
        let outcome = agent.handle_fetch(&request, &lifetime).await;
        lifetime.settle().await;

        assert_eq!(outcome, FetchOutcome::PassThrough);
        assert!(network.calls().is_empty());
        assert!(agent.namespaces().keys(Role::Runtime).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_install_does_not_intercept() {
        let (agent, network, _host) = agent().await;
        network.respond(url("/").as_str(), ok("home"));
        network.fail(url("/static/manifest.json").as_str());
        network.respond(url("/static/logo.png").as_str(), logo());

        assert!(agent.install().await.is_err());
        assert_eq!(agent.state(), LifecycleState::Redundant);

        let lifetime = ExtendedLifetime::new();
        let request = InterceptedRequest::get(url("/static/logo.png"), "image/png");
        let outcome = agent.handle_fetch(&request, &lifetime).await;
        lifetime.settle().await;

        assert_eq!(outcome, FetchOutcome::PassThrough);
        assert!(!network.calls().contains(&url("/static/logo.png").to_string()));
        assert!(agent.namespaces().keys(Role::Runtime).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_superseded_agent_stops_intercepting() {
        let (agent, network, _host) = active_agent().await;
        network.respond(url("/static/logo.png").as_str(), logo());
        agent.supersede().await;
        assert_eq!(agent.state(), LifecycleState::Redundant);

        let lifetime = ExtendedLifetime::new();
        let request = InterceptedRequest::get(url("/static/logo.png"), "image/png");
        assert_eq!(agent.handle_fetch(&request, &lifetime).await, FetchOutcome::PassThrough);
        assert!(agent.namespaces().keys(Role::Runtime).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_active_agent_caches_static_asset() {
        let (agent, network, _host) = active_agent().await;
        network.respond(url("/static/logo.png").as_str(), logo());

        let lifetime = ExtendedLifetime::new();
        let request = InterceptedRequest::get(url("/static/logo.png"), "image/png");
        let outcome = agent.handle_fetch(&request, &lifetime).await;
        lifetime.settle().await;

        assert_eq!(outcome, FetchOutcome::Respond(Resolution::Network(logo())));
        let keys = agent.namespaces().keys(Role::Runtime).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].url(), url("/static/logo.png").as_str());
    }

    #[tokio::test]
    async fn test_install_activate_then_offline_navigation() {
        let (agent, _network, host) = active_agent().await;
        assert_eq!(agent.state(), LifecycleState::Active);

        let lifetime = ExtendedLifetime::new();
        let request = InterceptedRequest::get(url("/hospitals/"), "text/html");
        let outcome = agent.handle_fetch(&request, &lifetime).await;

        assert_eq!(outcome, FetchOutcome::Respond(Resolution::Offline(ok("<h1>CuraLink</h1>"))));
        assert_eq!(host.directives(), vec!["skip_waiting".to_string(), "claim_clients".to_string()]);
    }

    #[tokio::test]
    async fn test_navigation_served_from_precache_and_refreshed() {
        let (agent, network, _host) = active_agent().await;

        network.respond(url("/").as_str(), ok("updated"));
        let lifetime = ExtendedLifetime::new();
        let request = InterceptedRequest::get(url("/"), "text/html");

        let first = agent.handle_fetch(&request, &lifetime).await;
        lifetime.settle().await;
        let second = agent.handle_fetch(&request, &lifetime).await;

        assert_eq!(first, FetchOutcome::Respond(Resolution::Cache(ok("<h1>CuraLink</h1>"))));
        assert_eq!(second, FetchOutcome::Respond(Resolution::Cache(ok("updated"))));
        let core = agent.namespaces().lookup_in(Role::Core, &RequestKey::get(&url("/"))).await.unwrap();
        assert_eq!(core, Some(ok("<h1>CuraLink</h1>")));
    }

    #[tokio::test]
    async fn test_push_and_sync_dispatch() {
        let (agent, _network, host) = agent().await;
        agent.handle_push(None).await.unwrap();
        agent.handle_notification_click("open", "/").await.unwrap();

        let lifetime = ExtendedLifetime::new();
        assert!(agent.handle_sync("sync-appointments", &lifetime));
        lifetime.settle().await;

        assert_eq!(host.directives(), vec!["show_notification".to_string(), "open_window /".to_string()]);
    }
}
