//! curalink-sw entry point.
//!
//! Reads trigger events as JSON lines on stdin and answers on stdout.
//! Logging goes to stderr to keep stdout free for the host protocol.

use std::sync::Arc;

use anyhow::Result;
use curalink_agent::{ExtendedLifetime, ServiceAgent};
use curalink_client::{FetchClient, FetchConfig, canonicalize};
use curalink_core::{AppConfig, CacheDb, InterceptedRequest};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

mod protocol;

use protocol::{HostEvent, HostMessage, StdioHost};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(protocol::write_messages(rx));
    let host = Arc::new(StdioHost::new(tx.clone()));
    let agent = Arc::new(ServiceAgent::new(&config, db, network, host)?);

    tracing::info!(
        core = %config.core_cache,
        runtime = %config.runtime_cache,
        db = %config.db_path.display(),
        "curalink-sw listening on stdio"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut inflight = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event: HostEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable event");
                if tx.send(HostMessage::error("unknown", &e)).is_err() {
                    tracing::warn!("host channel closed");
                }
                continue;
            }
        };

        match event {
            // Lifecycle phases are ordered: activate must observe a finished install.
            HostEvent::Install | HostEvent::Activate | HostEvent::Supersede => dispatch(&agent, event, &tx).await,
            event => {
                let agent = agent.clone();
                let tx = tx.clone();
                inflight.spawn(async move { dispatch(&agent, event, &tx).await });
            }
        }
    }

    while let Some(result) = inflight.join_next().await {
        if let Err(e) = result {
            tracing::warn!(error = %e, "event task failed");
        }
    }

    drop(agent);
    drop(tx);
    writer.await??;

    Ok(())
}

/// Handle one event, then hold it open until its side effects settle.
async fn dispatch(agent: &ServiceAgent, event: HostEvent, tx: &UnboundedSender<HostMessage>) {
    let name = event.name();
    let lifetime = ExtendedLifetime::new();

    let message = match event {
        HostEvent::Install => match agent.install().await {
            Ok(()) => Some(HostMessage::Installed),
            Err(e) => Some(HostMessage::error(name, &e)),
        },
        HostEvent::Activate => match agent.activate().await {
            Ok(report) => Some(HostMessage::Activated { deleted: report.deleted, failed: report.failed }),
            Err(e) => Some(HostMessage::error(name, &e)),
        },
        HostEvent::Supersede => {
            agent.supersede().await;
            Some(HostMessage::Superseded)
        }
        HostEvent::Fetch { id, method, url, accept } => match canonicalize(&url) {
            Ok(url) => {
                let request = InterceptedRequest::new(method, url, accept);
                let outcome = agent.handle_fetch(&request, &lifetime).await;
                Some(HostMessage::from_outcome(id, outcome))
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "not intercepting unparseable url");
                Some(HostMessage::Passthrough { id })
            }
        },
        HostEvent::Sync { tag } => {
            agent.handle_sync(&tag, &lifetime);
            None
        }
        HostEvent::Push { data } => {
            let text = protocol::push_text(data.as_ref());
            agent.handle_push(text.as_deref()).await.err().map(|e| HostMessage::error(name, &e))
        }
        HostEvent::NotificationClick { action, data } => agent
            .handle_notification_click(&action, &data)
            .await
            .err()
            .map(|e| HostMessage::error(name, &e)),
    };

    if let Some(message) = message
        && tx.send(message).is_err()
    {
        tracing::warn!(event = name, "host channel closed");
    }

    let report = lifetime.settle().await;
    if report.completed + report.cancelled + report.panicked > 0 {
        tracing::debug!(event = name, ?report, "extended lifetime settled");
    }
}
