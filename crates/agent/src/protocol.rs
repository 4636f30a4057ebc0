//! Newline-delimited JSON protocol between the agent and its host process.
//!
//! Inbound lines are trigger events; outbound lines are fetch outcomes, host
//! directives and lifecycle results.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use curalink_agent::{FetchOutcome, Host, Notification, Resolution};
use curalink_core::Error;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

fn default_method() -> String {
    "GET".into()
}

/// Trigger events delivered by the host.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum HostEvent {
    Install,
    Activate,
    /// A newer agent version has taken over.
    Supersede,
    Fetch {
        #[serde(default)]
        id: Option<serde_json::Value>,
        #[serde(default = "default_method")]
        method: String,
        url: String,
        #[serde(default)]
        accept: Option<String>,
    },
    Sync {
        tag: String,
    },
    Push {
        /// Either a JSON object or the raw payload text.
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
    NotificationClick {
        #[serde(default)]
        action: String,
        #[serde(default)]
        data: String,
    },
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::Install => "install",
            HostEvent::Activate => "activate",
            HostEvent::Supersede => "supersede",
            HostEvent::Fetch { .. } => "fetch",
            HostEvent::Sync { .. } => "sync",
            HostEvent::Push { .. } => "push",
            HostEvent::NotificationClick { .. } => "notificationclick",
        }
    }
}

/// Raw push text as the agent's push handler expects it.
pub fn push_text(data: Option<&serde_json::Value>) -> Option<String> {
    match data? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Lines written to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Passthrough {
        id: Option<serde_json::Value>,
    },
    Respond {
        id: Option<serde_json::Value>,
        source: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_text: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        headers: Vec<(String, String)>,
        /// Response body, base64 encoded so binary payloads survive the trip.
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        body_encoding: Option<&'static str>,
    },
    SkipWaiting,
    ClaimClients,
    ShowNotification {
        notification: Notification,
    },
    OpenWindow {
        url: String,
    },
    Installed,
    Superseded,
    Activated {
        deleted: Vec<String>,
        failed: Vec<String>,
    },
    Error {
        event: String,
        message: String,
    },
}

impl HostMessage {
    pub fn from_outcome(id: Option<serde_json::Value>, outcome: FetchOutcome) -> Self {
        let resolution = match outcome {
            FetchOutcome::PassThrough => return HostMessage::Passthrough { id },
            FetchOutcome::Respond(resolution) => resolution,
        };
        let source = resolution.source();
        match resolution.into_response() {
            Some(response) => HostMessage::Respond {
                id,
                source,
                status: Some(response.status),
                status_text: Some(response.status_text),
                headers: response.headers,
                body: Some(STANDARD.encode(&response.body)),
                body_encoding: Some("base64"),
            },
            None => HostMessage::Respond {
                id,
                source: Resolution::Unresolved.source(),
                status: None,
                status_text: None,
                headers: Vec::new(),
                body: None,
                body_encoding: None,
            },
        }
    }

    pub fn error(event: &str, err: &dyn std::fmt::Display) -> Self {
        HostMessage::Error { event: event.to_string(), message: err.to_string() }
    }
}

/// Drain `rx` to stdout, one JSON document per line.
pub async fn write_messages(mut rx: UnboundedReceiver<HostMessage>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = rx.recv().await {
        let mut line = match serde_json::to_vec(&message) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode host message");
                continue;
            }
        };
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// `Host` that forwards directives over the protocol channel.
pub struct StdioHost {
    tx: UnboundedSender<HostMessage>,
}

impl StdioHost {
    pub fn new(tx: UnboundedSender<HostMessage>) -> Self {
        Self { tx }
    }

    fn send(&self, message: HostMessage) -> Result<(), Error> {
        self.tx.send(message).map_err(|e| Error::Host(e.to_string()))
    }
}

#[async_trait]
impl Host for StdioHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.send(HostMessage::SkipWaiting)
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.send(HostMessage::ClaimClients)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.send(HostMessage::ShowNotification { notification: notification.clone() })
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        self.send(HostMessage::OpenWindow { url: url.to_string() })
    }
}
