//! Core of the waystation offline worker.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Request classification and response strategies
//! - Offline fallback responses
//! - Worker lifecycle (install, activate, update) and the page message protocol
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod lifecycle;
pub mod network;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheDb, CacheManager, CacheStorage};
pub use classify::{Classifier, Route, Target};
pub use config::{ConfigError, WorkerConfig};
pub use error::Error;
pub use http::{Destination, Method, Request, Response, ResponseType};
pub use lifecycle::{HostSignal, HostStatus, MessageReply, WorkerHost, WorkerMessage, WorkerPhase, WorkerState};
pub use network::Network;
pub use strategy::{Served, Source, Strategy};
pub use worker::OfflineWorker;
