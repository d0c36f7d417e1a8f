//! Lifecycle Controller.

pub mod host;
pub mod messages;
pub mod state;

pub use host::{HostSignal, HostStatus, WorkerHost};
pub use messages::{CacheSizeReply, MessageReply, VersionReply, WorkerMessage};
pub use state::{Effect, LifecycleEvent, WorkerPhase, WorkerState};
