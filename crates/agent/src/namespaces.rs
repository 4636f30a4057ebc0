//! Cache Namespace Manager.
//!
//! Owns the two logical partitions: the versioned core namespace filled at
//! install time and the runtime namespace filled while browsing. Lookups
//! search only these two, runtime first, so a fresher runtime copy shadows the
//! install-time copy of the same URL.

use curalink_core::{AppConfig, CacheDb, Error, RequestKey, ResponseSnapshot};

/// Logical role of a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Core,
    Runtime,
}

#[derive(Debug, Clone)]
pub struct NamespaceManager {
    db: CacheDb,
    core: String,
    runtime: String,
}

impl NamespaceManager {
    pub fn new(db: CacheDb, core: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self { db, core: core.into(), runtime: runtime.into() }
    }

    pub fn from_config(db: CacheDb, config: &AppConfig) -> Self {
        Self::new(db, config.core_cache.clone(), config.runtime_cache.clone())
    }

    pub fn name(&self, role: Role) -> &str {
        match role {
            Role::Core => &self.core,
            Role::Runtime => &self.runtime,
        }
    }

    /// Whether `name` is one of the two current namespaces.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.core || name == self.runtime
    }

    pub async fn open(&self, role: Role) -> Result<(), Error> {
        self.db.open_namespace(self.name(role)).await
    }

    /// Search runtime, then core. First hit wins.
    pub async fn lookup(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        for role in [Role::Runtime, Role::Core] {
            if let Some(hit) = self.db.match_entry(self.name(role), key).await? {
                tracing::debug!(key = %key, namespace = self.name(role), "cache hit");
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    pub async fn lookup_in(&self, role: Role, key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        self.db.match_entry(self.name(role), key).await
    }

    /// Overwrite the runtime entry for `key`.
    pub async fn put_runtime(&self, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error> {
        self.db.put_entry(&self.runtime, key, response).await
    }

    /// Write the whole pre-cache set into the core namespace atomically.
    pub async fn fill_core(&self, items: &[(RequestKey, ResponseSnapshot)]) -> Result<(), Error> {
        self.db.put_entries(&self.core, items).await
    }

    /// Every existing namespace name, current or not.
    pub async fn all_names(&self) -> Result<Vec<String>, Error> {
        self.db.namespace_names().await
    }

    /// Delete a namespace by name. Refuses to delete a current namespace.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        if self.is_current(name) {
            return Err(Error::InvalidInput(format!("refusing to delete current namespace {name}")));
        }
        self.db.delete_namespace(name).await
    }

    pub async fn keys(&self, role: Role) -> Result<Vec<RequestKey>, Error> {
        self.db.entry_keys(self.name(role)).await
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }
}
