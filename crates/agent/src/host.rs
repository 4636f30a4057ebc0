//! Outbound host primitives.
//!
//! Cache and network access go through `NamespaceManager` and `Network`;
//! everything else the agent asks of its environment goes through `Host`.

use async_trait::async_trait;
use curalink_core::Error;
use serde::Serialize;

/// A button shown on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Everything needed to display one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// URL opened when the "open" action is chosen.
    pub data: String,
    pub actions: Vec<NotificationAction>,
}

#[async_trait]
pub trait Host: Send + Sync {
    /// Skip the default wait between install and activate.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of pages that are already open.
    async fn claim_clients(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    /// Open a window or tab at `url`.
    async fn open_window(&self, url: &str) -> Result<(), Error>;
}
