//! Lifecycle Controller.
//!
//! `Installing -> WaitingToActivate -> Active`, with `Redundant` for an install
//! that failed or an agent that has been superseded.
//!
//! Install fills the core namespace with the pre-cache set, all or nothing.
//! Activate deletes every namespace that is not one of the two current ones.

use std::sync::Arc;

use curalink_client::{Network, resolve_path};
use curalink_core::{Error, InterceptedRequest, RequestKey};
use url::Url;

use crate::host::Host;
use crate::namespaces::{NamespaceManager, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    WaitingToActivate,
    Active,
    Redundant,
}

/// Result of an activation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    /// Names whose deletion failed; they are retried on the next activation.
    pub failed: Vec<String>,
}

pub struct LifecycleController {
    namespaces: NamespaceManager,
    network: Arc<dyn Network>,
    precache: Vec<Url>,
    state: LifecycleState,
}

impl LifecycleController {
    /// `precache_paths` are resolved against `origin` up front.
    pub fn new(
        namespaces: NamespaceManager, network: Arc<dyn Network>, origin: &Url, precache_paths: &[String],
    ) -> Result<Self, Error> {
        let precache = precache_paths
            .iter()
            .map(|p| resolve_path(origin, p).map_err(|e| Error::InvalidUrl(format!("{p}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { namespaces, network, precache, state: LifecycleState::Installing })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Fetch every pre-cache URL, then commit them to the core namespace in one
    /// transaction and ask the host to skip waiting.
    ///
    /// # Errors
    ///
    /// Any fetch failure or non-2xx status aborts the install with
    /// `Error::PrecacheFailed`; nothing is written and the controller becomes
    /// `Redundant`.
    pub async fn install(&mut self, host: &dyn Host) -> Result<(), Error> {
        if self.state != LifecycleState::Installing {
            return Err(Error::Lifecycle(format!("cannot install from {:?}", self.state)));
        }
        tracing::info!(namespace = self.namespaces.name(Role::Core), urls = self.precache.len(), "installing");

        match self.precache_all().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!(error = %e, "cache installation failed");
                self.state = LifecycleState::Redundant;
                return Err(e);
            }
        }

        self.state = LifecycleState::WaitingToActivate;
        host.skip_waiting().await?;
        Ok(())
    }

    async fn precache_all(&self) -> Result<(), Error> {
        let mut items = Vec::with_capacity(self.precache.len());
        for url in &self.precache {
            let request = InterceptedRequest::get(url.clone(), "*/*");
            let response = self.network.fetch(&request).await.map_err(|e| Error::PrecacheFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            if !response.is_ok() {
                return Err(Error::PrecacheFailed {
                    url: url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            items.push((RequestKey::get(url), response));
        }

        self.namespaces.open(Role::Core).await?;
        self.namespaces.fill_core(&items).await
    }

    /// Delete stale namespaces, make sure both current ones exist, then claim
    /// open pages.
    ///
    /// Storage failures are logged and skipped; only a wrong starting state is
    /// an error.
    pub async fn activate(&mut self, host: &dyn Host) -> Result<ActivationReport, Error> {
        if self.state != LifecycleState::WaitingToActivate {
            return Err(Error::Lifecycle(format!("cannot activate from {:?}", self.state)));
        }
        tracing::info!("activating");

        let mut report = ActivationReport::default();
        match self.namespaces.all_names().await {
            Ok(names) => {
                let stale: Vec<String> = names.into_iter().filter(|n| !self.namespaces.is_current(n)).collect();
                for name in stale {
                    match self.namespaces.delete(&name).await {
                        Ok(_) => {
                            tracing::info!(namespace = %name, "clearing old cache");
                            report.deleted.push(name);
                        }
                        Err(e) => {
                            tracing::warn!(namespace = %name, error = %e, "failed to delete old cache");
                            report.failed.push(name);
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to enumerate caches"),
        }

        for role in [Role::Core, Role::Runtime] {
            if let Err(e) = self.namespaces.open(role).await {
                tracing::warn!(namespace = self.namespaces.name(role), error = %e, "failed to open cache");
            }
        }

        self.state = LifecycleState::Active;
        host.claim_clients().await?;
        Ok(report)
    }

    /// Mark this agent as replaced by a newer version.
    pub fn supersede(&mut self) {
        self.state = LifecycleState::Redundant;
    }
}
