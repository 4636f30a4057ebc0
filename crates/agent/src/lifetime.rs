//! Extended lifetime for event side effects.
//!
//! Handlers return as soon as the page has its response, but cache writes and
//! background refreshes started by the handler must still finish. They are
//! registered here and the host settles the handle before letting the agent
//! go idle.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;

/// Outcome counts from settling a lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifetimeReport {
    pub completed: usize,
    pub cancelled: usize,
    pub panicked: usize,
}

/// Shared handle; clones register into the same set.
#[derive(Debug, Clone, Default)]
pub struct ExtendedLifetime {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl ExtendedLifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the event alive until `work` completes.
    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.lock().spawn(work);
    }

    /// Number of registered tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run every registered task to completion, including tasks registered
    /// while settling.
    pub async fn settle(&self) -> LifetimeReport {
        let mut report = LifetimeReport::default();
        loop {
            let mut batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return report;
            }
            while let Some(result) = batch.join_next().await {
                match result {
                    Ok(()) => report.completed += 1,
                    Err(e) if e.is_cancelled() => report.cancelled += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, "extended-lifetime task panicked");
                        report.panicked += 1;
                    }
                }
            }
        }
    }

    /// Cancel outstanding work. A later `settle` reports it as cancelled.
    pub fn abort(&self) {
        self.lock().abort_all();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
