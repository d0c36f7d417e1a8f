//! Worker lifecycle as a pure state machine.
//!
//! `WorkerState::apply` never performs I/O. It returns the next state and
//! the effects the host must carry out, so every transition can be driven
//! with synthetic events.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerPhase {
    Installing,
    Waiting,
    Active,
    Redundant,
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerPhase::Installing => "installing",
            WorkerPhase::Waiting => "waiting",
            WorkerPhase::Active => "active",
            WorkerPhase::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Every manifest entry was fetched and stored.
    InstallSucceeded { skip_waiting: bool },
    InstallFailed,
    /// The controlling page asked a waiting worker to take over.
    SkipWaiting,
    /// The host promoted the worker.
    Activated,
    /// A newer worker replaced this one.
    Superseded,
}

/// Work the host performs after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    PromoteToActive,
    AnnounceUpdate,
    PurgeStalePartitions,
    ClaimClients,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkerState {
    pub version: String,
    pub phase: WorkerPhase,
    /// Set while an installed worker waits for permission to activate.
    pub update_available: bool,
}

impl WorkerState {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into(), phase: WorkerPhase::Installing, update_available: false }
    }

    /// Compute the transition for `event`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` when `event` is not legal in the current phase.
    pub fn apply(&self, event: LifecycleEvent) -> Result<(WorkerState, Vec<Effect>), Error> {
        use LifecycleEvent as E;
        use WorkerPhase as P;

        let mut next = self.clone();
        let effects = match (self.phase, &event) {
            (P::Installing, E::InstallSucceeded { skip_waiting: true }) => {
                next.phase = P::Waiting;
                vec![Effect::PromoteToActive]
            }
            (P::Installing, E::InstallSucceeded { skip_waiting: false }) => {
                next.phase = P::Waiting;
                next.update_available = true;
                vec![Effect::AnnounceUpdate]
            }
            (P::Installing, E::InstallFailed) => {
                next.phase = P::Redundant;
                vec![]
            }
            (P::Waiting, E::SkipWaiting) => vec![Effect::PromoteToActive],
            (P::Waiting, E::Activated) => {
                next.phase = P::Active;
                next.update_available = false;
                vec![Effect::PurgeStalePartitions, Effect::ClaimClients]
            }
            (P::Active, E::SkipWaiting) => vec![],
            (P::Installing | P::Waiting | P::Active, E::Superseded) => {
                next.phase = P::Redundant;
                next.update_available = false;
                vec![]
            }
            (phase, event) => {
                return Err(Error::InvalidState(format!("{event:?} not allowed while {phase} (v{})", self.version)));
            }
        };

        Ok((next, effects))
    }
}
