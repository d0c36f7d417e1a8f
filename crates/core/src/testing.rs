//! In-process network double for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use crate::error::Error;
use crate::http::{Request, Response};
use crate::network::Network;

/// Canned responses keyed by URL. Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl StubNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &Url, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    /// Make fetches of `url` fail at the transport level.
    pub(crate) fn fail(&self, url: &Url) {
        self.failing.lock().unwrap().push(url.to_string());
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Park every subsequent fetch until the returned `Notify` fires once per fetch.
    pub(crate) fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub(crate) fn calls_to(&self, url: &Url) -> usize {
        let url = url.to_string();
        self.calls.lock().unwrap().iter().filter(|c| **c == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&url) {
            return Err(Error::Network(format!("connection refused: {url}")));
        }

        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found")))
    }
}
