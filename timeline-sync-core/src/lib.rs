//! Core library for monday-timeline-sync.
//!
//! This crate holds everything below the HTTP layer:
//! - the [`sync::SyncEngine`], which propagates changes between a board's
//!   date columns and its timeline column
//! - the [`storage::KvStore`] abstraction with in-memory and sled backends
//! - the [`monday::MondayClient`] GraphQL API client

pub mod board_config;
pub mod error;
pub mod event;
pub mod monday;
pub mod storage;
pub mod sync;
pub mod values;

pub use board_config::{BoardSyncConfig, SyncMode};
pub use error::{Result, SyncError};
pub use event::{ColumnChangeEvent, WebhookPayload};
pub use monday::{BoardApi, BoardColumn, ColumnValue, MondayClient};
pub use storage::{KvStore, MemoryStore, SledStore};
pub use sync::{SyncAction, SyncEngine, SyncReport};
pub use values::{DateValue, TimelineValue};
