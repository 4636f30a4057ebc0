//! Push, notification-click and background-sync handlers.

use curalink_core::{Error, NotificationConfig};
use serde::Deserialize;

use crate::host::{Host, Notification, NotificationAction};
use crate::lifetime::ExtendedLifetime;

/// Optional JSON carried by a push message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
}

impl PushPayload {
    /// Parse raw push data. Missing or unparseable data yields an empty payload.
    pub fn parse(data: Option<&str>) -> Self {
        let Some(raw) = data.filter(|d| !d.trim().is_empty()) else {
            return Self::default();
        };
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unparseable push payload");
            Self::default()
        })
    }
}

pub fn build_notification(payload: PushPayload, config: &NotificationConfig) -> Notification {
    Notification {
        title: payload.title.unwrap_or_else(|| config.default_title.clone()),
        body: payload.body.unwrap_or_else(|| config.default_body.clone()),
        icon: config.icon.clone(),
        badge: config.badge.clone(),
        vibrate: config.vibrate.clone(),
        data: payload.url.unwrap_or_else(|| "/".to_string()),
        actions: vec![
            NotificationAction { action: "open".into(), title: "Open".into() },
            NotificationAction { action: "close".into(), title: "Close".into() },
        ],
    }
}

pub async fn handle_push(host: &dyn Host, data: Option<&str>, config: &NotificationConfig) -> Result<(), Error> {
    let notification = build_notification(PushPayload::parse(data), config);
    tracing::debug!(title = %notification.title, "showing notification");
    host.show_notification(&notification).await
}

/// The notification is closed either way; only "open" navigates.
pub async fn handle_notification_click(host: &dyn Host, action: &str, data: &str) -> Result<(), Error> {
    if action == "open" {
        host.open_window(data).await?;
    }
    Ok(())
}

/// Returns whether the tag was recognized.
pub fn handle_sync(tag: &str, sync_tag: &str, lifetime: &ExtendedLifetime) -> bool {
    if tag != sync_tag {
        tracing::debug!(tag, "ignoring unknown sync tag");
        return false;
    }
    lifetime.wait_until(sync_appointments());
    true
}

/// Replays offline appointment bookings. Nothing is queued offline yet, so
/// this only records that the sync ran.
async fn sync_appointments() {
    tracing::info!("background sync: syncing appointments");
}
