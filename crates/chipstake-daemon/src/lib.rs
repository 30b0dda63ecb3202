#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod service;
pub mod storage;
pub mod supervisor;

#[cfg(test)]
mod testing;

pub use api::{ApiError, ApiServer, ApiState};
pub use config::{ApiConfig, DaemonConfig, LoggingConfig, StorageSettings};
pub use service::{BatchEntry, LedgerService};
pub use storage::{LedgerStore, StorageConfig, StorageMetrics};
pub use supervisor::{CancelHandle, CancellationToken, EventFollower, FollowerExit};
