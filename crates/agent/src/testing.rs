//! Test doubles for the network and host seams.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use curalink_client::Network;
use curalink_core::{Error, InterceptedRequest, ResponseSnapshot};

use crate::host::{Host, Notification};

/// Network that replays scripted outcomes per URL. Unscripted URLs fail as
/// if offline.
#[derive(Default)]
pub struct ScriptedNetwork {
    scripts: Mutex<HashMap<String, VecDeque<Result<ResponseSnapshot, String>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: ResponseSnapshot) {
        self.push(url, Ok(response));
    }

    pub fn fail(&self, url: &str) {
        self.push(url, Err("connection refused".to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, url: &str, outcome: Result<ResponseSnapshot, String>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());
        let next = self.scripts.lock().unwrap().get_mut(&url).and_then(VecDeque::pop_front);
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(Error::FetchFailed(reason)),
            None => Err(Error::FetchFailed(format!("offline: {url}"))),
        }
    }
}

/// Host that records every directive it receives.
#[derive(Default)]
pub struct RecordingHost {
    pub directives: Mutex<Vec<String>>,
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingHost {
    pub fn directives(&self) -> Vec<String> {
        self.directives.lock().unwrap().clone()
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.directives.lock().unwrap().push("skip_waiting".into());
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.directives.lock().unwrap().push("claim_clients".into());
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.directives.lock().unwrap().push("show_notification".into());
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        self.directives.lock().unwrap().push(format!("open_window {url}"));
        Ok(())
    }
}

pub fn ok(body: &str) -> ResponseSnapshot {
    ResponseSnapshot::new(200, "OK", vec![("Content-Type".into(), "text/html".into())], body.to_string())
}
