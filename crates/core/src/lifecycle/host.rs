//! The platform side of the lifecycle.
//!
//! `WorkerHost` keeps the installing, waiting and active slots, drives
//! each worker's state machine and carries out the resulting effects.
//! Pages observe it through `HostSignal`s.

use std::collections::VecDeque;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};

use super::messages::{MessageReply, WorkerMessage};
use super::state::{Effect, LifecycleEvent, WorkerState};
use crate::cache::CacheManager;
use crate::error::Error;
use crate::http::Request;
use crate::network::Network;
use crate::strategy::{Served, Source};
use crate::worker::OfflineWorker;

const SIGNAL_CAPACITY: usize = 16;

/// Lifecycle notifications for pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum HostSignal {
    /// A new version installed and is waiting; pages may offer to reload.
    UpdateAvailable { version: String },
    /// A new version took control of open pages.
    ControllerChanged { version: String },
    InstallFailed { version: String, reason: String },
}

struct Slot {
    worker: Arc<OfflineWorker>,
    state: WorkerState,
}

impl Slot {
    fn transition(&mut self, event: LifecycleEvent) -> Result<Vec<Effect>, Error> {
        let (state, effects) = self.state.apply(event)?;
        tracing::info!(version = %state.version, from = %self.state.phase, to = %state.phase, "lifecycle transition");
        self.state = state;
        Ok(effects)
    }
}

#[derive(Default)]
struct Slots {
    installing: Option<Slot>,
    waiting: Option<Slot>,
    active: Option<Slot>,
}

/// Snapshot of the host's slots.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HostStatus {
    pub installing: Option<WorkerState>,
    pub waiting: Option<WorkerState>,
    pub active: Option<WorkerState>,
    /// Partitions present in storage.
    pub partitions: Vec<String>,
}

pub struct WorkerHost {
    slots: Mutex<Slots>,
    cache: CacheManager,
    network: Arc<dyn Network>,
    signals: broadcast::Sender<HostSignal>,
}

impl WorkerHost {
    pub fn new(cache: CacheManager, network: Arc<dyn Network>) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { slots: Mutex::new(Slots::default()), cache, network, signals }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostSignal> {
        self.signals.subscribe()
    }

    /// Install `worker` and, when allowed, promote it.
    ///
    /// The current active worker keeps serving while the install runs. A
    /// worker with no active predecessor is promoted right away; otherwise
    /// it is promoted only if it skips waiting.
    ///
    /// # Errors
    ///
    /// Returns the install error (the worker becomes redundant and the
    /// active worker is untouched), or `Error::InvalidState` if another
    /// deploy replaced this one mid-install.
    pub async fn deploy(&self, worker: OfflineWorker) -> Result<WorkerState, Error> {
        let worker = Arc::new(worker);
        let version = worker.version().to_string();

        {
            let mut slots = self.slots.lock().await;
            let slot = Slot { worker: worker.clone(), state: WorkerState::new(version.clone()) };
            if let Some(mut replaced) = slots.installing.replace(slot) {
                replaced.transition(LifecycleEvent::Superseded)?;
            }
        }

        let installed = worker.install().await;

        let mut slots = self.slots.lock().await;
        let mut slot = match slots.installing.take() {
            Some(slot) if Arc::ptr_eq(&slot.worker, &worker) => slot,
            other => {
                slots.installing = other;
                return Err(Error::InvalidState(format!("v{version} was replaced while installing")));
            }
        };

        if let Err(e) = installed {
            slot.transition(LifecycleEvent::InstallFailed)?;
            tracing::warn!(version = %version, error = %e, "install failed, keeping current worker");
            let _ = self.signals.send(HostSignal::InstallFailed { version, reason: e.to_string() });
            return Err(e);
        }

        let skip_waiting = worker.skip_waiting() || slots.active.is_none();
        let effects = slot.transition(LifecycleEvent::InstallSucceeded { skip_waiting })?;
        if let Some(mut replaced) = slots.waiting.replace(slot) {
            replaced.transition(LifecycleEvent::Superseded)?;
        }
        self.run(&mut slots, effects).await?;

        Ok(Self::state_of(&slots, &worker).unwrap_or_else(|| WorkerState::new(version)))
    }

    /// Promote the waiting worker, as asked by a `SKIP_WAITING` message.
    pub async fn skip_waiting(&self) -> Result<WorkerState, Error> {
        let mut slots = self.slots.lock().await;
        let Some(waiting) = slots.waiting.as_mut() else {
            return Err(Error::InvalidState("no worker is waiting".into()));
        };
        let worker = waiting.worker.clone();
        let effects = waiting.transition(LifecycleEvent::SkipWaiting)?;
        self.run(&mut slots, effects).await?;

        Self::state_of(&slots, &worker).ok_or_else(|| Error::InvalidState("promotion did not complete".into()))
    }

    /// Route a fetch to the active worker. Without one the request is not
    /// intercepted and goes straight to the network.
    pub async fn fetch(&self, request: &Request) -> Result<Served, Error> {
        let active = self.active_worker().await;
        match active {
            Some(worker) => Ok(worker.handle_fetch(request).await),
            None => {
                let response = self.network.fetch(request).await?;
                Ok(Served { response, source: Source::Passthrough, revalidation: None })
            }
        }
    }

    /// Route a page message. `SKIP_WAITING` goes to the waiting worker,
    /// everything else to the active one.
    pub async fn post_message(&self, message: WorkerMessage) -> Result<Option<MessageReply>, Error> {
        if message == WorkerMessage::SkipWaiting {
            self.skip_waiting().await?;
            return Ok(None);
        }

        let worker = self.require_active().await?;
        worker.handle_message(message).await
    }

    /// Deliver a background sync event to the active worker.
    pub async fn background_sync(&self, tag: &str) -> Result<bool, Error> {
        let worker = self.require_active().await?;
        Ok(worker.background_sync(tag).await)
    }

    pub async fn status(&self) -> Result<HostStatus, Error> {
        let (installing, waiting, active) = {
            let slots = self.slots.lock().await;
            let state = |slot: &Option<Slot>| slot.as_ref().map(|s| s.state.clone());
            (state(&slots.installing), state(&slots.waiting), state(&slots.active))
        };
        let partitions = self.cache.partitions().await?;
        Ok(HostStatus { installing, waiting, active, partitions })
    }

    pub async fn active_worker(&self) -> Option<Arc<OfflineWorker>> {
        self.slots.lock().await.active.as_ref().map(|s| s.worker.clone())
    }

    async fn require_active(&self) -> Result<Arc<OfflineWorker>, Error> {
        self.active_worker().await.ok_or_else(|| Error::InvalidState("no active worker".into()))
    }

    async fn run(&self, slots: &mut Slots, effects: Vec<Effect>) -> Result<(), Error> {
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::AnnounceUpdate => {
                    if let Some(waiting) = &slots.waiting {
                        let version = waiting.state.version.clone();
                        tracing::info!(version = %version, "update available");
                        let _ = self.signals.send(HostSignal::UpdateAvailable { version });
                    }
                }
                Effect::PromoteToActive => queue.extend(Self::promote(slots)?),
                Effect::PurgeStalePartitions => {
                    if let Some(active) = &slots.active
                        && let Err(e) = active.worker.activate().await
                    {
                        tracing::warn!(version = %active.state.version, error = %e, "stale partition purge failed");
                    }
                }
                Effect::ClaimClients => {
                    if let Some(active) = &slots.active {
                        let version = active.state.version.clone();
                        tracing::info!(version = %version, "claimed clients");
                        let _ = self.signals.send(HostSignal::ControllerChanged { version });
                    }
                }
            }
        }

        Ok(())
    }

    fn promote(slots: &mut Slots) -> Result<Vec<Effect>, Error> {
        let Some(mut next) = slots.waiting.take() else {
            return Ok(vec![]);
        };
        let effects = next.transition(LifecycleEvent::Activated)?;
        if let Some(mut previous) = slots.active.replace(next) {
            previous.transition(LifecycleEvent::Superseded)?;
        }
        Ok(effects)
    }

    fn state_of(slots: &Slots, worker: &Arc<OfflineWorker>) -> Option<WorkerState> {
        [&slots.installing, &slots.waiting, &slots.active]
            .into_iter()
            .flatten()
            .find(|s| Arc::ptr_eq(&s.worker, worker))
            .map(|s| s.state.clone())
    }
}
